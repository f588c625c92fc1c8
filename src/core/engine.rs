// src/core/engine.rs
use crate::core::dictionary::DictionaryIndex;
use crate::core::layout::{KeyCode, KeyLayout};
use crate::core::matcher::Matcher;
use crate::core::trace::{trace_for_word, TraceBuilder};
use crate::core::types::{render_word, ShiftState};
use crate::error::PersistenceError;
use crate::persistence::{self, UserDictionary};
use log::info;
use parking_lot::RwLock;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// How many completions a prefix lookup returns.
const COMPLETION_COUNT: usize = 10;

/// The decoding facade: owns the key layout, the current dictionary index
/// snapshot, and the user dictionary.
///
/// The index lives behind a swappable `Arc`. Every decode clones the `Arc`
/// once on entry and runs entirely against that snapshot, so a dictionary
/// rebuild (user word added, corpus switched) never mutates an index a
/// decode is reading — the new index is built first, then the reference is
/// swapped, and in-flight readers finish on the old one.
pub struct ImeEngine {
    layout: KeyLayout,
    index: RwLock<Arc<DictionaryIndex>>,
    corpus_words: Vec<(String, u8)>,
    user_dictionary: RwLock<UserDictionary>,
    user_dictionary_path: Option<PathBuf>,
}

impl ImeEngine {
    /// An engine with an empty dictionary: gestures decode to nothing but
    /// nothing fails.
    pub fn new(layout: KeyLayout) -> Self {
        Self {
            layout,
            index: RwLock::new(Arc::new(DictionaryIndex::empty())),
            corpus_words: Vec::new(),
            user_dictionary: RwLock::new(UserDictionary::new()),
            user_dictionary_path: None,
        }
    }

    /// An engine over a corpus stream. A corpus that cannot be fully read
    /// contributes what it has; an unreadable one leaves the dictionary
    /// empty rather than failing.
    pub fn with_corpus<R: Read>(layout: KeyLayout, corpus: R) -> Self {
        let mut engine = Self::new(layout);
        engine.set_corpus(corpus);
        engine
    }

    /// Replaces the corpus and rebuilds the index. Snapshots taken by
    /// in-flight decodes stay valid.
    pub fn set_corpus<R: Read>(&mut self, corpus: R) {
        self.corpus_words = persistence::read_corpus(corpus);
        self.rebuild_index();
    }

    /// Loads (or starts) the user dictionary at `path` and folds it into the
    /// index. Subsequent `add_user_word` calls persist there.
    pub fn attach_user_dictionary(&mut self, path: impl Into<PathBuf>) -> Result<(), PersistenceError> {
        let path = path.into();
        let dictionary = if path.exists() {
            UserDictionary::load(&path)?
        } else {
            UserDictionary::new()
        };
        *self.user_dictionary.write() = dictionary;
        self.user_dictionary_path = Some(path);
        self.rebuild_index();
        Ok(())
    }

    /// Adds a word to the user dictionary, persists the list, and swaps in a
    /// rebuilt index. The word is guessable from the next gesture on.
    pub fn add_user_word(&self, word: &str, frequency: i64) -> Result<(), PersistenceError> {
        {
            let mut dictionary = self.user_dictionary.write();
            dictionary.insert(word, frequency);
            if let Some(path) = &self.user_dictionary_path {
                dictionary.save(path)?;
            }
        }
        self.rebuild_index();
        Ok(())
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// The index snapshot current decodes run against.
    pub fn index_snapshot(&self) -> Arc<DictionaryIndex> {
        self.index.read().clone()
    }

    /// Decodes a raw gesture into ranked word candidates. A gesture that
    /// settles on a single point is a tap: it falls back to the nearest key
    /// instead of the matcher.
    pub fn decode_gesture(
        &self,
        samples: &[(f32, f32, u64)],
        shift: ShiftState,
        num_guesses: usize,
    ) -> Vec<Option<String>> {
        let mut builder = TraceBuilder::new(&self.layout);
        for &(x, y, time) in samples {
            builder.add_sample(x, y, time);
        }
        let trace = builder.finish();
        if trace.len() < 2 {
            let position = trace
                .first()
                .map(|p| (p.x, p.y))
                .or_else(|| samples.last().map(|&(x, y, _)| (x, y)));
            let mut choices = vec![None; num_guesses];
            if let (Some((x, y)), Some(slot)) = (position, choices.first_mut()) {
                *slot = self.single_key_guess(x, y, shift);
            }
            return choices;
        }
        let index = self.index_snapshot();
        let guesses = Matcher::new(&index).guess_word(&trace, shift, num_guesses);
        compact_unique(guesses, num_guesses)
    }

    /// Completions for a literally-typed prefix; always ten slots.
    pub fn completions_for_prefix(&self, prefix: &str) -> Vec<Option<String>> {
        let index = self.index_snapshot();
        compact_unique(index.find_words_starting_with(prefix), COMPLETION_COUNT)
    }

    /// Alternatives for a word that is already committed text: decode the
    /// ideal trace of the word itself and drop the word from the results.
    pub fn suggest_replacements(
        &self,
        word: &str,
        shift: ShiftState,
        num_guesses: usize,
    ) -> Vec<Option<String>> {
        let trace = trace_for_word(word, &self.layout);
        if trace.len() < 2 {
            return vec![None; num_guesses];
        }
        let index = self.index_snapshot();
        let mut guesses = Matcher::new(&index).guess_word(&trace, shift, num_guesses + 1);
        for guess in &mut guesses {
            if guess.as_deref() == Some(word) {
                *guess = None;
            }
        }
        compact_unique(guesses, num_guesses)
    }

    fn single_key_guess(&self, x: f32, y: f32, shift: ShiftState) -> Option<String> {
        let (key, _) = self.layout.nearest_key(x, y)?;
        match self.layout.key(key) {
            KeyCode::Char(c) => Some(render_word(&c.to_string(), shift)),
            _ => None,
        }
    }

    fn rebuild_index(&self) {
        let user_words = self.user_dictionary.read().entries().to_vec();
        let index = DictionaryIndex::from_word_lists(self.corpus_words.clone(), user_words);
        info!("dictionary index rebuilt: {} words", index.len());
        *self.index.write() = Arc::new(index);
    }
}

/// Compacts a candidate list front-to-back: drops empty slots and repeated
/// strings, preserves order, and pads back out with `None`.
fn compact_unique(candidates: Vec<Option<String>>, limit: usize) -> Vec<Option<String>> {
    let mut out: Vec<Option<String>> = Vec::with_capacity(limit);
    for candidate in candidates.into_iter().flatten() {
        if out.len() == limit {
            break;
        }
        if out
            .iter()
            .any(|seen| seen.as_deref() == Some(candidate.as_str()))
        {
            continue;
        }
        out.push(Some(candidate));
    }
    out.resize(limit, None);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::KeyCode;
    use crate::persistence::write_corpus;

    fn two_key_layout() -> KeyLayout {
        KeyLayout::new(
            vec![KeyCode::Char('a'), KeyCode::Char('b')],
            vec![(0.0, 0.0), (100.0, 0.0)],
            100.0,
        )
    }

    fn corpus_bytes(entries: &[(&str, u8)]) -> Vec<u8> {
        let list: Vec<(String, u8)> = entries
            .iter()
            .map(|(w, f)| (w.to_string(), *f))
            .collect();
        let mut buf = Vec::new();
        write_corpus(&mut buf, &list).unwrap();
        buf
    }

    fn line_samples() -> Vec<(f32, f32, u64)> {
        (0..=5).map(|i| (i as f32 * 20.0, 0.0, i * 20)).collect()
    }

    #[test]
    fn straight_drag_from_a_to_b_decodes_ab_first() {
        let corpus = corpus_bytes(&[("ab", 200), ("ba", 50)]);
        let engine = ImeEngine::with_corpus(two_key_layout(), &corpus[..]);
        let guesses = engine.decode_gesture(&line_samples(), ShiftState::Off, 2);
        assert_eq!(guesses[0].as_deref(), Some("ab"));
    }

    #[test]
    fn empty_corpus_decodes_to_all_none_without_failing() {
        let engine = ImeEngine::with_corpus(two_key_layout(), std::io::empty());
        let guesses = engine.decode_gesture(&line_samples(), ShiftState::Off, 5);
        assert_eq!(guesses, vec![None; 5]);
    }

    #[test]
    fn decoding_is_deterministic() {
        let corpus = corpus_bytes(&[("ab", 200), ("ba", 50)]);
        let engine = ImeEngine::with_corpus(two_key_layout(), &corpus[..]);
        let first = engine.decode_gesture(&line_samples(), ShiftState::Off, 5);
        let second = engine.decode_gesture(&line_samples(), ShiftState::Off, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn tap_falls_back_to_the_nearest_key() {
        let engine = ImeEngine::new(two_key_layout());
        let samples = [(95.0, 2.0, 0), (97.0, 1.0, 10), (96.0, 0.0, 20)];
        let guesses = engine.decode_gesture(&samples, ShiftState::Off, 3);
        assert_eq!(guesses[0].as_deref(), Some("b"));
        assert_eq!(&guesses[1..], &[None, None]);
        let shifted = engine.decode_gesture(&samples, ShiftState::Shift, 1);
        assert_eq!(shifted[0].as_deref(), Some("B"));
    }

    #[test]
    fn tap_far_from_every_key_decodes_to_nothing() {
        let engine = ImeEngine::new(two_key_layout());
        let samples = [(500.0, 500.0, 0), (501.0, 500.0, 10)];
        let guesses = engine.decode_gesture(&samples, ShiftState::Off, 2);
        assert_eq!(guesses, vec![None, None]);
    }

    #[test]
    fn replacements_exclude_the_word_itself() {
        let layout = KeyLayout::english();
        let corpus = corpus_bytes(&[("held", 80), ("hello", 120), ("help", 90)]);
        let engine = ImeEngine::with_corpus(layout, &corpus[..]);
        let suggestions = engine.suggest_replacements("hello", ShiftState::Off, 5);
        assert!(suggestions
            .iter()
            .flatten()
            .all(|candidate| candidate != "hello"));
        assert!(suggestions[0].is_some());
    }

    #[test]
    fn added_user_words_become_guessable_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_dictionary.bin");
        let mut engine = ImeEngine::with_corpus(two_key_layout(), std::io::empty());
        engine.attach_user_dictionary(&path).unwrap();
        engine.add_user_word("ab", 400).unwrap();
        let guesses = engine.decode_gesture(&line_samples(), ShiftState::Off, 2);
        assert_eq!(guesses[0].as_deref(), Some("ab"));
        let stored = UserDictionary::load(&path).unwrap();
        assert_eq!(stored.entries(), &[("ab".to_string(), 255)]);
    }

    #[test]
    fn duplicate_dictionary_entries_collapse_to_one_candidate() {
        let corpus = corpus_bytes(&[("ab", 10)]);
        let engine = ImeEngine::with_corpus(two_key_layout(), &corpus[..]);
        // same word again through the user dictionary
        engine.add_user_word("ab", 200).unwrap();
        let guesses = engine.decode_gesture(&line_samples(), ShiftState::Off, 3);
        assert_eq!(guesses[0].as_deref(), Some("ab"));
        assert_eq!(&guesses[1..], &[None, None]);
    }

    #[test]
    fn completions_come_from_the_engine_snapshot() {
        let corpus = corpus_bytes(&[("tea", 10), ("ten", 50), ("test", 200)]);
        let engine = ImeEngine::with_corpus(KeyLayout::english(), &corpus[..]);
        let completions = engine.completions_for_prefix("te");
        assert_eq!(completions.len(), 10);
        assert_eq!(completions[0].as_deref(), Some("test"));
        assert_eq!(completions[1].as_deref(), Some("ten"));
        assert_eq!(completions[2].as_deref(), Some("tea"));
    }
}
