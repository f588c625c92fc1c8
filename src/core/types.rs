// src/core/types.rs
use serde::{Deserialize, Serialize};

/// Index of a word in the dictionary's sorted arrays.
pub type WordId = usize;

/// The characters a gesture can slide through: the 26 letters plus
/// apostrophe, in slide-index order.
pub const SLIDE_CHARS: &[u8; 27] = b"abcdefghijklmnopqrstuvwxyz'";

/// Number of slide characters.
pub const SLIDE_CHAR_COUNT: usize = SLIDE_CHARS.len();

/// Maps a trace-spelling byte to its slide index (0..=26), or None for
/// anything that has no slide key.
pub fn slide_index(c: u8) -> Option<usize> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as usize),
        b'\'' => Some(26),
        _ => None,
    }
}

/// State of the shift modifier when a gesture is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftState {
    Off,
    /// Capitalize the first letter of the committed word.
    Shift,
    /// Uppercase the whole word.
    CapsLock,
}

/// Renders a dictionary word according to the shift state it was gestured
/// under.
pub fn render_word(word: &str, shift: ShiftState) -> String {
    match shift {
        ShiftState::Off => word.to_string(),
        ShiftState::Shift => {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        ShiftState::CapsLock => word.to_uppercase(),
    }
}

/// One via-key observation: a letter key the raw trajectory passed near
/// between two settled trace points. Ordering key is the timestamp of the
/// nearest approach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracedKey {
    pub letter: u8,
    pub nearest_distance: f32,
    pub nearest_time: u64,
}

/// One settled, weighted location along a decoded gesture.
///
/// `key_distances` holds the normalized (key-spacing unit) distance from this
/// point to each slide character's key, `f32::MAX` where the layout has no
/// such key. `via_keys` records the letters passed near since the previous
/// point, deduplicated by letter with the nearest observation winning.
#[derive(Debug, Clone)]
pub struct TracePoint {
    pub x: f32,
    pub y: f32,
    /// Alignment importance: 1.0 for endpoints and sharp turns, down toward
    /// 0.5 for straight pass-through segments.
    pub weight: f32,
    pub key_distances: [f32; SLIDE_CHAR_COUNT],
    pub via_keys: Vec<TracedKey>,
    via_index: [i32; SLIDE_CHAR_COUNT],
}

impl TracePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            weight: 1.0,
            key_distances: [f32::MAX; SLIDE_CHAR_COUNT],
            via_keys: Vec::new(),
            via_index: [-1; SLIDE_CHAR_COUNT],
        }
    }

    /// Records that the trajectory passed near a letter key. Nearest
    /// observation wins; one entry per letter.
    pub fn add_via_key(&mut self, letter: u8, distance: f32, time: u64) {
        for key in &mut self.via_keys {
            if key.letter == letter {
                if distance < key.nearest_distance {
                    key.nearest_distance = distance;
                    key.nearest_time = time;
                }
                return;
            }
        }
        self.via_keys.push(TracedKey {
            letter,
            nearest_distance: distance,
            nearest_time: time,
        });
    }

    pub fn add_via_keys(&mut self, keys: &[TracedKey]) {
        for key in keys {
            self.add_via_key(key.letter, key.nearest_distance, key.nearest_time);
        }
    }

    /// Merges another point into this one: per-letter minimum on key
    /// distances, union on via keys.
    pub fn merge_from(&mut self, other: &TracePoint) {
        self.add_via_keys(&other.via_keys);
        for (mine, theirs) in self.key_distances.iter_mut().zip(&other.key_distances) {
            *mine = mine.min(*theirs);
        }
    }

    /// Squared distance to another point, in the same units as the
    /// coordinates.
    pub fn distance2(&self, other: &TracePoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Normalized distance from this point to the key for a trace-spelling
    /// character.
    pub fn key_distance(&self, c: u8) -> f32 {
        match slide_index(c) {
            Some(i) => self.key_distances[i],
            None => f32::MAX,
        }
    }

    /// Position of a letter in the time-ordered via list, -1 if the letter
    /// was never passed. Only meaningful after `finalize_via_keys`.
    pub fn via_key_index(&self, c: u8) -> i32 {
        match slide_index(c) {
            Some(i) => self.via_index[i],
            None => -1,
        }
    }

    /// Sorts the via list by nearest-approach time and builds the dense
    /// letter-to-position index used during alignment scoring.
    pub fn finalize_via_keys(&mut self) {
        self.via_keys.sort_by_key(|key| key.nearest_time);
        self.via_index = [-1; SLIDE_CHAR_COUNT];
        for (pos, key) in self.via_keys.iter().enumerate() {
            if let Some(i) = slide_index(key.letter) {
                self.via_index[i] = pos as i32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_takes_per_letter_minimum() {
        let mut a = TracePoint::new(0.0, 0.0);
        let mut b = TracePoint::new(1.0, 0.0);
        a.key_distances[0] = 0.3;
        a.key_distances[1] = 0.9;
        b.key_distances[0] = 0.5;
        b.key_distances[1] = 0.2;
        let before = a.key_distances;
        a.merge_from(&b);
        assert_eq!(a.key_distances[0], 0.3);
        assert_eq!(a.key_distances[1], 0.2);
        for (after, before) in a.key_distances.iter().zip(&before) {
            assert!(after <= before);
        }
    }

    #[test]
    fn merge_unions_via_keys() {
        let mut a = TracePoint::new(0.0, 0.0);
        let mut b = TracePoint::new(1.0, 0.0);
        a.add_via_key(b'x', 0.4, 10);
        b.add_via_key(b'x', 0.1, 20);
        b.add_via_key(b'y', 0.2, 30);
        a.merge_from(&b);
        assert_eq!(a.via_keys.len(), 2);
        let x = a.via_keys.iter().find(|k| k.letter == b'x').unwrap();
        assert_eq!(x.nearest_distance, 0.1);
        assert_eq!(x.nearest_time, 20);
        assert!(a.via_keys.iter().any(|k| k.letter == b'y'));
    }

    #[test]
    fn via_dedup_keeps_nearest_observation() {
        let mut p = TracePoint::new(0.0, 0.0);
        p.add_via_key(b'q', 0.4, 5);
        p.add_via_key(b'q', 0.6, 9);
        p.add_via_key(b'q', 0.2, 7);
        assert_eq!(p.via_keys.len(), 1);
        assert_eq!(p.via_keys[0].nearest_distance, 0.2);
        assert_eq!(p.via_keys[0].nearest_time, 7);
    }

    #[test]
    fn via_index_follows_timestamp_order() {
        let mut p = TracePoint::new(0.0, 0.0);
        p.add_via_key(b'b', 0.1, 30);
        p.add_via_key(b'a', 0.1, 10);
        p.add_via_key(b'c', 0.1, 20);
        p.finalize_via_keys();
        assert_eq!(p.via_key_index(b'a'), 0);
        assert_eq!(p.via_key_index(b'c'), 1);
        assert_eq!(p.via_key_index(b'b'), 2);
        assert_eq!(p.via_key_index(b'z'), -1);
    }

    #[test]
    fn shift_rendering() {
        assert_eq!(render_word("hello", ShiftState::Off), "hello");
        assert_eq!(render_word("hello", ShiftState::Shift), "Hello");
        assert_eq!(render_word("hello", ShiftState::CapsLock), "HELLO");
        assert_eq!(render_word("", ShiftState::Shift), "");
    }
}
