// src/core/matcher.rs
use crate::core::dictionary::{DictionaryIndex, SHORT_PREFIX_LENGTH};
use crate::core::types::{render_word, ShiftState, TracePoint, WordId};

// Empirically tuned scoring constants. They interlock; changing one without
// a reference corpus to validate against will degrade guess quality.
const PREFIX_CUTOFF: f32 = 3.0;
const MEDIUM_PREFIX_CUTOFF: f32 = 3.5;
const LONG_PREFIX_CUTOFF: f32 = 5.0;
const MISSING_VIA_LETTER: f32 = 1.0;
const VIA_DISTANCE_MULTIPLIER: f32 = 0.2;
const UNORDERED_VIA_COST: f32 = 0.5;
/// A new best prefix score widens the pruning band to best + this margin so
/// close competitors survive discovery.
const PREFIX_SCORE_BAND: f32 = 2.0;
/// Words and prefixes whose first letter sits farther than this from the
/// first trace point are never scored.
const FIRST_KEY_GATE: f32 = 0.7;
const FREQUENCY_WEIGHT: f32 = 0.0025;

/// The scoring and search half of gesture decoding: given a finalized trace
/// and a dictionary index snapshot, finds the best-scoring words using
/// prefix-tier pruning and a divide-and-conquer alignment cost.
///
/// Lower scores are better. All cutoff state is threaded through the call
/// tree explicitly, so concurrent matches against the same index are safe.
pub struct Matcher<'a> {
    index: &'a DictionaryIndex,
}

impl<'a> Matcher<'a> {
    pub fn new(index: &'a DictionaryIndex) -> Self {
        Self { index }
    }

    /// Returns up to `num_guesses` words, best first after frequency
    /// adjustment, with `None` in unfilled slots. A trace of fewer than two
    /// points belongs to the single-key path and yields nothing here.
    pub fn guess_word(
        &self,
        trace: &[TracePoint],
        shift: ShiftState,
        num_guesses: usize,
    ) -> Vec<Option<String>> {
        let mut choices = vec![None; num_guesses];
        if trace.len() < 2 || num_guesses == 0 {
            return choices;
        }
        let num_candidates = num_guesses * 2;
        let sum_weights: f32 = trace.iter().map(|p| p.weight).sum();
        let mut best = CandidateList::new(num_candidates, sum_weights);

        // Step 1: discover candidate tier-1 prefixes under an adaptive
        // cutoff that tightens to a band around the best score seen.
        let mut candidate_prefixes: Vec<(usize, f32)> = Vec::new();
        let mut prefix_cutoff = PREFIX_CUTOFF;
        for (id, run) in self.index.prefixes.iter().enumerate() {
            if trace[0].key_distance(run.prefix[0]) > FIRST_KEY_GATE {
                continue;
            }
            let score = score_prefix(&run.prefix, trace, prefix_cutoff);
            if score < prefix_cutoff {
                candidate_prefixes.push((id, score));
                if score < prefix_cutoff - PREFIX_SCORE_BAND {
                    prefix_cutoff = score + PREFIX_SCORE_BAND;
                }
            }
        }
        candidate_prefixes.retain(|&(_, score)| score <= prefix_cutoff);
        candidate_prefixes.sort_by(|a, b| a.1.total_cmp(&b.1));

        let min_length = trace.len() / 2;
        let max_length = (trace.len() as f32 * 1.26) as usize + 3;

        // Step 2: words too short for the tiers are scanned exhaustively.
        if min_length < SHORT_PREFIX_LENGTH {
            for &id in &self.index.short_words {
                let Some(word) = self.index.trace(id) else {
                    continue;
                };
                if word.len() < min_length {
                    continue;
                }
                if trace[0].key_distance(word[0]) > FIRST_KEY_GATE {
                    continue;
                }
                let score = score_word(word, trace, best.worst());
                best.insert(id, score);
            }
        }

        // Step 3: walk surviving prefixes cheapest-first; the medium and
        // long tiers reject whole runs, and their cutoffs tighten as the
        // candidate list fills with good scores.
        let mut last_medium = -1i32;
        let mut last_long = -1i32;
        let mut skip_medium = false;
        let mut skip_long = false;
        let mut medium_cutoff = MEDIUM_PREFIX_CUTOFF;
        let mut long_cutoff = LONG_PREFIX_CUTOFF;
        for &(prefix_id, _) in &candidate_prefixes {
            let run = &self.index.prefixes[prefix_id];
            for id in run.start..run.end {
                let Some(word) = self.index.trace(id) else {
                    continue;
                };
                if word.len() < min_length || word.len() > max_length {
                    continue;
                }
                let medium = self.index.medium_index[id];
                if medium == last_medium {
                    if skip_medium {
                        continue;
                    }
                } else {
                    last_medium = medium;
                    skip_medium = false;
                    if medium > -1 {
                        let prefix = &self.index.medium_prefixes[medium as usize];
                        let score = score_prefix(prefix, trace, medium_cutoff);
                        if score > medium_cutoff {
                            skip_medium = true;
                            continue;
                        }
                        if score + PREFIX_SCORE_BAND < medium_cutoff {
                            medium_cutoff = score + PREFIX_SCORE_BAND;
                        }
                    }
                }
                let long = self.index.long_index[id];
                if long == last_long {
                    if skip_long {
                        continue;
                    }
                } else {
                    last_long = long;
                    skip_long = false;
                    if long > -1 {
                        let prefix = &self.index.long_prefixes[long as usize];
                        let score = score_prefix(prefix, trace, long_cutoff);
                        if score > long_cutoff {
                            skip_long = true;
                            continue;
                        }
                        if score + PREFIX_SCORE_BAND < long_cutoff {
                            long_cutoff = score + PREFIX_SCORE_BAND;
                        }
                    }
                }
                let score = score_word(word, trace, best.worst());
                if best.insert(id, score) {
                    if best.worst() < medium_cutoff {
                        medium_cutoff = best.worst();
                    }
                    if best.worst() < long_cutoff {
                        long_cutoff = best.worst();
                    }
                }
            }
        }

        // Step 4: frequency-adjusted re-sort, then render the top guesses.
        let mut ranked: Vec<(WordId, f32)> = best
            .words
            .iter()
            .zip(&best.scores)
            .filter_map(|(&word, &score)| {
                word.map(|id| (id, score - FREQUENCY_WEIGHT * f32::from(self.index.frequency(id))))
            })
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (slot, &(id, _)) in ranked.iter().take(num_guesses).enumerate() {
            choices[slot] = Some(render_word(self.index.word(id), shift));
        }
        choices
    }
}

/// Fixed-size best-score list. Linear insertion; the list holds at most
/// twice the guess count, so anything cleverer would cost more than it
/// saves.
struct CandidateList {
    words: Vec<Option<WordId>>,
    scores: Vec<f32>,
}

impl CandidateList {
    fn new(capacity: usize, initial_score: f32) -> Self {
        Self {
            words: vec![None; capacity],
            scores: vec![initial_score; capacity],
        }
    }

    fn worst(&self) -> f32 {
        *self.scores.last().expect("list has capacity")
    }

    fn insert(&mut self, word: WordId, score: f32) -> bool {
        if score >= self.worst() {
            return false;
        }
        let mut at = 0;
        while score >= self.scores[at] {
            at += 1;
        }
        for i in (at + 1..self.scores.len()).rev() {
            self.words[i] = self.words[i - 1];
            self.scores[i] = self.scores[i - 1];
        }
        self.words[at] = Some(word);
        self.scores[at] = score;
        true
    }
}

/// Best alignment cost of a word prefix against the leading span of the
/// trace, searching over where along the trace the prefix could end.
fn score_prefix(word: &[u8], trace: &[TracePoint], mut cutoff: f32) -> f32 {
    let min_trace = (word.len() - 1) / 2;
    let max_trace = trace.len().min((word.len() as f32 * 1.25).ceil() as usize);
    let first = &trace[0];
    let first_cost = first.key_distance(word[0]) * first.weight;
    cutoff -= first_cost;
    let mut best_score = cutoff + 0.01;
    for end in min_trace..max_trace {
        let score = score_range(word, trace, 0, word.len() - 1, 0, end, cutoff);
        if score < best_score {
            best_score = score;
            cutoff = best_score;
        }
    }
    first_cost + best_score
}

/// Alignment cost of a whole word against the whole trace.
fn score_word(word: &[u8], trace: &[TracePoint], mut cutoff: f32) -> f32 {
    let first = &trace[0];
    let first_cost = first.key_distance(word[0]) * first.weight;
    cutoff -= first_cost;
    first_cost + score_range(word, trace, 0, word.len() - 1, 0, trace.len() - 1, cutoff)
}

/// Divide-and-conquer alignment: split the trace range at its midpoint, try
/// every word split within a quarter-length margin, and keep the cheapest
/// total. A branch dies as soon as its partial cost exceeds the cutoff, and
/// every improvement tightens the cutoff for the remaining splits.
fn score_range(
    word: &[u8],
    trace: &[TracePoint],
    word_start: usize,
    word_end: usize,
    trace_start: usize,
    trace_end: usize,
    mut cutoff: f32,
) -> f32 {
    let length = trace_end - trace_start;
    if length < 2 {
        return score_segment(word, trace, word_start, word_end, trace_end);
    }
    let mut best_score = cutoff + 0.01;
    let mid = trace_start + length / 2;
    let margin = length / 4;
    let Some(last_split) = word_end.checked_sub(margin) else {
        return best_score;
    };
    let mut split = word_start + margin;
    while split <= last_split {
        let head = score_range(word, trace, word_start, split, trace_start, mid, cutoff);
        if head < cutoff {
            let total =
                head + score_range(word, trace, split, word_end, mid, trace_end, cutoff - head);
            if total < best_score {
                best_score = total;
                cutoff = best_score;
            }
        }
        split += 1;
    }
    best_score
}

/// Base case: the last word character of the range lands on the trace
/// point; characters between the range ends must appear as via keys of the
/// previous point, each miss or out-of-order pass adding a penalty.
fn score_segment(
    word: &[u8],
    trace: &[TracePoint],
    word_start: usize,
    word_end: usize,
    trace_end: usize,
) -> f32 {
    let mut score = 0.0;
    let c = word[word_end];
    if trace_end == 0 {
        score += word_end as f32;
    } else if word_start < word_end {
        let prev_char = word[word_start];
        let point = &trace[trace_end - 1];
        let mut last_index = -1i32;
        for current in word_start + 1..word_end {
            let via = word[current];
            if via == prev_char {
                continue;
            }
            let index = point.via_key_index(via);
            if via != c {
                if index == -1 {
                    score += MISSING_VIA_LETTER;
                    continue;
                }
                score += VIA_DISTANCE_MULTIPLIER
                    * point.via_keys[index as usize].nearest_distance;
                if index < last_index {
                    score += UNORDERED_VIA_COST;
                }
            }
            last_index = index;
        }
    }
    let point = &trace[trace_end];
    score + point.key_distance(c) * point.weight
}
