// --- File: src/core/dictionary.rs
use crate::core::types::WordId;
use log::debug;
use std::cmp::Ordering;
use std::io::Read;

/// Words with a trace spelling shorter than this are scanned exhaustively
/// instead of through the prefix tiers.
pub const SHORT_PREFIX_LENGTH: usize = 5;
const MEDIUM_PREFIX_LENGTH: usize = 7;
const LONG_PREFIX_LENGTH: usize = 9;

/// A run of consecutive words sharing a trace-spelling prefix.
#[derive(Debug, Clone)]
pub(crate) struct PrefixRange {
    pub prefix: Box<[u8]>,
    pub start: WordId,
    pub end: WordId,
}

/// An immutable, build-once index over a word list: canonical trace
/// spellings, frequencies, and three tiers of shared-prefix buckets that let
/// the matcher reject whole contiguous word ranges before scoring them.
///
/// Built once per dictionary selection, never during a gesture. Swapping
/// dictionaries means building a fresh index and replacing the reference;
/// readers keep whatever snapshot they captured.
pub struct DictionaryIndex {
    words: Vec<String>,
    /// Trace spelling per word; None for words with no slide-able character,
    /// which stay reachable through prefix completion only.
    traces: Vec<Option<Box<[u8]>>>,
    frequency: Vec<u8>,
    /// Tier 1 (length 5): covers every word whose trace reaches that length,
    /// singleton runs included, since this tier drives candidate
    /// enumeration.
    pub(crate) prefixes: Vec<PrefixRange>,
    pub(crate) short_words: Vec<WordId>,
    /// Tiers 2 and 3 (lengths 7 and 9) keep only runs of two or more words;
    /// the index arrays map each word to its run, or -1.
    pub(crate) medium_prefixes: Vec<Box<[u8]>>,
    pub(crate) medium_index: Vec<i32>,
    pub(crate) long_prefixes: Vec<Box<[u8]>>,
    pub(crate) long_index: Vec<i32>,
}

impl DictionaryIndex {
    /// An index over nothing: every lookup misses, every guess comes back
    /// empty. The stand-in when no corpus could be read.
    pub fn empty() -> Self {
        Self::from_word_lists(Vec::new(), Vec::new())
    }

    /// Builds the index from a corpus stream plus user-dictionary entries.
    /// A corpus that cannot be read (or stops mid-record) contributes the
    /// records read so far; the index is built from whatever arrived.
    pub fn build<R: Read>(corpus: R, user_words: &[(String, u8)]) -> Self {
        let corpus_words = crate::persistence::read_corpus(corpus);
        Self::from_word_lists(corpus_words, user_words.to_vec())
    }

    /// Core constructor: stable-merges the (already sorted) corpus list with
    /// the user list, derives trace spellings, and scans once per tier.
    /// O(W·L) after the merge.
    pub fn from_word_lists(
        corpus_words: Vec<(String, u8)>,
        mut user_words: Vec<(String, u8)>,
    ) -> Self {
        user_words.sort_by(|a, b| cmp_words_ci(&a.0, &b.0));
        let total = corpus_words.len() + user_words.len();
        let mut merged: Vec<(String, u8)> = Vec::with_capacity(total);
        {
            let mut main_iter = corpus_words.into_iter().peekable();
            let mut user_iter = user_words.into_iter().peekable();
            loop {
                match (main_iter.peek(), user_iter.peek()) {
                    (Some(m), Some(u)) => {
                        if cmp_words_ci(&m.0, &u.0) == Ordering::Less {
                            merged.push(main_iter.next().expect("peeked"));
                        } else {
                            merged.push(user_iter.next().expect("peeked"));
                        }
                    }
                    (Some(_), None) => merged.push(main_iter.next().expect("peeked")),
                    (None, Some(_)) => merged.push(user_iter.next().expect("peeked")),
                    (None, None) => break,
                }
            }
        }

        let mut words = Vec::with_capacity(merged.len());
        let mut traces = Vec::with_capacity(merged.len());
        let mut frequency = Vec::with_capacity(merged.len());
        for (word, freq) in merged {
            traces.push(trace_spelling(&word));
            words.push(word);
            frequency.push(freq);
        }

        // Tier 1 plus the short-word list, in one scan.
        let mut prefixes: Vec<PrefixRange> = Vec::new();
        let mut short_words: Vec<WordId> = Vec::new();
        for (i, trace) in traces.iter().enumerate() {
            let Some(trace) = trace.as_deref() else {
                continue;
            };
            if trace.len() >= SHORT_PREFIX_LENGTH {
                match prefixes.last_mut() {
                    Some(run) if trace.starts_with(&run.prefix) => run.end = i + 1,
                    _ => prefixes.push(PrefixRange {
                        prefix: trace[..SHORT_PREFIX_LENGTH].into(),
                        start: i,
                        end: i + 1,
                    }),
                }
            } else {
                short_words.push(i);
            }
        }
        let (medium_prefixes, medium_index) = find_prefixes(MEDIUM_PREFIX_LENGTH, &traces);
        let (long_prefixes, long_index) = find_prefixes(LONG_PREFIX_LENGTH, &traces);
        // tier arrays misaligned with the word array would be a programming
        // error, not a data problem
        debug_assert_eq!(medium_index.len(), words.len());
        debug_assert_eq!(long_index.len(), words.len());
        debug!(
            "dictionary index: {} words, {} short, {}/{}/{} prefix runs",
            words.len(),
            short_words.len(),
            prefixes.len(),
            medium_prefixes.len(),
            long_prefixes.len()
        );
        Self {
            words,
            traces,
            frequency,
            prefixes,
            short_words,
            medium_prefixes,
            medium_index,
            long_prefixes,
            long_index,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, id: WordId) -> &str {
        &self.words[id]
    }

    pub fn frequency(&self, id: WordId) -> u8 {
        self.frequency[id]
    }

    pub(crate) fn trace(&self, id: WordId) -> Option<&[u8]> {
        self.traces[id].as_deref()
    }

    /// Finds the most common words starting with a literal prefix,
    /// case-insensitively: binary search for the range, then a fixed-size
    /// insertion list ordered by descending frequency. Serves completion
    /// after character-by-character typing, not gesture decoding.
    pub fn find_words_starting_with(&self, prefix: &str) -> Vec<Option<String>> {
        let start = self
            .words
            .partition_point(|w| cmp_words_ci(w, prefix) == Ordering::Less);
        let mut end = start;
        while end < self.words.len() && starts_with_ignore_case(&self.words[end], prefix) {
            end += 1;
        }

        let mut indices: [i64; 10] = [-1; 10];
        let last = indices.len() - 1;
        for i in start..end {
            if indices[last] == -1 || self.frequency[i] > self.frequency[indices[last] as usize] {
                let mut insert = 0;
                while indices[insert] > -1
                    && self.frequency[i] <= self.frequency[indices[insert] as usize]
                {
                    insert += 1;
                }
                for j in (insert + 1..indices.len()).rev() {
                    indices[j] = indices[j - 1];
                }
                indices[insert] = i as i64;
            }
        }
        indices
            .iter()
            .map(|&i| (i > -1).then(|| self.words[i as usize].clone()))
            .collect()
    }
}

/// One scan building a prefix tier: a run starts when the current word's
/// prefix of `size` characters differs from the running one, and is kept
/// only if the next word shares it. Returns the run prefixes plus a
/// per-word index into them (-1 for words outside every run).
fn find_prefixes(size: usize, traces: &[Option<Box<[u8]>>]) -> (Vec<Box<[u8]>>, Vec<i32>) {
    let mut prefixes: Vec<Box<[u8]>> = Vec::new();
    let mut index = vec![-1i32; traces.len()];
    let mut current: Option<Box<[u8]>> = None;
    for i in 0..traces.len() {
        match traces[i].as_deref() {
            Some(word) if word.len() >= size => {
                let continues = current
                    .as_deref()
                    .map_or(false, |prefix| word.starts_with(prefix));
                if !continues {
                    let prefix = &word[..size];
                    let next_shares = traces
                        .get(i + 1)
                        .and_then(|t| t.as_deref())
                        .map_or(false, |next| next.starts_with(prefix));
                    if next_shares {
                        prefixes.push(prefix.into());
                        current = Some(prefix.into());
                    } else {
                        current = None;
                    }
                }
                index[i] = match current {
                    Some(_) => prefixes.len() as i32 - 1,
                    None => -1,
                };
            }
            _ => current = None,
        }
    }
    (prefixes, index)
}

/// Derives a word's canonical trace spelling: lowercase a-z and apostrophe
/// only, accents folded to their base letter, anything unmappable becoming
/// the apostrophe slide key. A trailing period is dropped first, so
/// abbreviations trace without it. Words with no slide-able character at all
/// get no spelling and never participate in gesture matching.
pub(crate) fn trace_spelling(word: &str) -> Option<Box<[u8]>> {
    if !word.is_empty() && word.bytes().all(|b| b == b'\'' || b.is_ascii_lowercase()) {
        return Some(word.as_bytes().into());
    }
    let mut chars: Vec<char> = word.chars().collect();
    if chars.last() == Some(&'.') {
        chars.pop();
    }
    let mut trace = Vec::with_capacity(chars.len());
    let mut slideable = false;
    for ch in chars {
        match trace_char(ch) {
            Some(c) => {
                slideable = true;
                trace.push(c);
            }
            None => trace.push(b'\''),
        }
    }
    (slideable && !trace.is_empty()).then(|| trace.into_boxed_slice())
}

/// Maps one word character to its trace byte: lowercased letters and the
/// apostrophe map to themselves, accented letters fold to their base form,
/// everything else has no slide key of its own.
pub fn trace_char(ch: char) -> Option<u8> {
    let c = ch.to_lowercase().next().unwrap_or(ch);
    if c == '\'' || c.is_ascii_lowercase() {
        return Some(c as u8);
    }
    fold_accent(c).map(|folded| folded as u8)
}

/// Nearest plain-letter equivalents for the accented and symbol characters
/// the key layouts offer as long-press alternates.
fn fold_accent(c: char) -> Option<char> {
    Some(match c {
        'á' | 'à' | 'ä' | 'â' | 'å' | 'æ' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'œ' | 'ø' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' | '©' => 'c',
        'ð' => 'd',
        'π' | '¶' => 'p',
        '®' => 'r',
        'ß' | '§' => 's',
        'þ' | '™' => 't',
        _ => return None,
    })
}

/// Case-insensitive word ordering: per-character lowercase comparison, with
/// the shorter word first on ties. Every sorted structure in the index uses
/// this same ordering.
pub(crate) fn cmp_words_ci(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars();
    let mut b_chars = b.chars();
    loop {
        match (a_chars.next(), b_chars.next()) {
            (Some(ca), Some(cb)) => {
                let la = lower1(ca);
                let lb = lower1(cb);
                if la != lb {
                    return la.cmp(&lb);
                }
            }
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
        }
    }
}

fn starts_with_ignore_case(word: &str, prefix: &str) -> bool {
    let mut word_chars = word.chars();
    for pc in prefix.chars() {
        match word_chars.next() {
            Some(wc) if lower1(wc) == lower1(pc) => {}
            _ => return false,
        }
    }
    true
}

fn lower1(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(words: &[(&str, u8)]) -> DictionaryIndex {
        let list: Vec<(String, u8)> = words
            .iter()
            .map(|(w, f)| (w.to_string(), *f))
            .collect();
        DictionaryIndex::from_word_lists(Vec::new(), list)
    }

    #[test]
    fn trace_spellings_use_only_slide_characters() {
        for word in ["Hello", "naïve", "café", "O'Brien", "etc.", "don't", "Zürich"] {
            let trace = trace_spelling(word).unwrap();
            assert!(
                trace.iter().all(|&c| c == b'\'' || c.is_ascii_lowercase()),
                "bad spelling for {word}: {:?}",
                trace
            );
        }
    }

    #[test]
    fn accents_fold_to_base_letters() {
        assert_eq!(trace_spelling("naïve").unwrap().as_ref(), b"naive");
        assert_eq!(trace_spelling("café").unwrap().as_ref(), b"cafe");
        assert_eq!(trace_spelling("Straße").unwrap().as_ref(), b"strase");
    }

    #[test]
    fn trailing_period_is_dropped() {
        assert_eq!(trace_spelling("etc.").unwrap().as_ref(), b"etc");
    }

    #[test]
    fn unmappable_characters_become_apostrophe() {
        assert_eq!(trace_spelling("e-mail").unwrap().as_ref(), b"e'mail");
    }

    #[test]
    fn words_without_slideable_characters_are_excluded() {
        assert!(trace_spelling("123").is_none());
        assert!(trace_spelling("$%").is_none());
        assert!(trace_spelling("").is_none());
        // a literal apostrophe is a slide key
        assert!(trace_spelling("'").is_some());
    }

    #[test]
    fn merge_interleaves_user_words() {
        let corpus = vec![("apple".to_string(), 10), ("cherry".to_string(), 20)];
        let user = vec![("banana".to_string(), 30)];
        let index = DictionaryIndex::from_word_lists(corpus, user);
        assert_eq!(index.word(0), "apple");
        assert_eq!(index.word(1), "banana");
        assert_eq!(index.word(2), "cherry");
        assert_eq!(index.frequency(1), 30);
    }

    #[test]
    fn prefix_tiers_partition_their_ranges() {
        let index = index_of(&[
            ("abcdefghij", 1),
            ("abcdefghik", 2),
            ("abcdefxyz", 3),
            ("abcdeqrs", 4),
            ("abc", 5),
            ("zzzzzz", 6),
        ]);
        // tier 1 covers every word of trace length >= 5, singletons included
        let mut covered = vec![false; index.len()];
        for run in &index.prefixes {
            assert!(run.end > run.start);
            for i in run.start..run.end {
                let trace = index.trace(i).unwrap();
                assert!(trace.starts_with(&run.prefix));
                covered[i] = true;
            }
        }
        for i in 0..index.len() {
            let trace = index.trace(i).unwrap();
            if trace.len() >= SHORT_PREFIX_LENGTH {
                assert!(covered[i], "word {i} not covered by tier 1");
            } else {
                assert!(index.short_words.contains(&i));
            }
        }
        // medium/long runs have at least two members and consistent indices
        for (index_array, prefixes, size) in [
            (&index.medium_index, &index.medium_prefixes, 7),
            (&index.long_index, &index.long_prefixes, 9),
        ] {
            for (i, &run) in index_array.iter().enumerate() {
                if run == -1 {
                    continue;
                }
                let prefix = &prefixes[run as usize];
                assert_eq!(prefix.len(), size);
                assert!(index.trace(i).unwrap().starts_with(prefix));
            }
            for (run, prefix) in prefixes.iter().enumerate() {
                let members = index_array.iter().filter(|&&r| r == run as i32).count();
                assert!(members >= 2, "run {:?} has {} member(s)", prefix, members);
            }
        }
        // sorted order: abc, abcdefghij, abcdefghik, abcdefxyz, abcdeqrs,
        // zzzzzz; the two abcdefghi words share medium and long runs while
        // abcdeqrs is in neither
        assert_eq!(index.word(1), "abcdefghij");
        assert_eq!(index.medium_index[1], index.medium_index[2]);
        assert_ne!(index.medium_index[1], -1);
        assert_eq!(index.long_index[1], index.long_index[2]);
        assert_eq!(index.word(4), "abcdeqrs");
        assert_eq!(index.medium_index[4], -1);
    }

    #[test]
    fn completions_are_ordered_by_descending_frequency() {
        let index = index_of(&[("tea", 10), ("ten", 50), ("test", 200)]);
        let completions = index.find_words_starting_with("te");
        assert_eq!(completions.len(), 10);
        assert_eq!(completions[0].as_deref(), Some("test"));
        assert_eq!(completions[1].as_deref(), Some("ten"));
        assert_eq!(completions[2].as_deref(), Some("tea"));
        assert!(completions[3..].iter().all(|c| c.is_none()));
    }

    #[test]
    fn completions_ignore_case() {
        let index = index_of(&[("Tea", 10), ("ten", 50)]);
        let completions = index.find_words_starting_with("TE");
        assert_eq!(completions[0].as_deref(), Some("ten"));
        assert_eq!(completions[1].as_deref(), Some("Tea"));
    }

    #[test]
    fn empty_corpus_builds_an_empty_index() {
        let index = DictionaryIndex::build(std::io::empty(), &[]);
        assert!(index.is_empty());
        assert!(index.prefixes.is_empty());
        assert!(index.short_words.is_empty());
        assert!(index
            .find_words_starting_with("a")
            .iter()
            .all(|c| c.is_none()));
    }
}
