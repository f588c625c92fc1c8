// src/core/layout.rs
use crate::core::types::{slide_index, SLIDE_CHAR_COUNT, SLIDE_CHARS};
use serde::{Deserialize, Serialize};

/// Logical key code: a printable character or a control sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyCode {
    Char(char),
    Enter,
    Delete,
    ForwardDelete,
    Shift,
    Alt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyClass {
    Vowel,
    Consonant,
    Number,
    Punctuation,
    Control,
}

/// Static key geometry: codes, semantic classes, pixel positions and the
/// key-spacing unit all distances are normalized by. Immutable after
/// construction; the rest of the crate never sees raw screen geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyLayout {
    keys: Vec<KeyCode>,
    classes: Vec<KeyClass>,
    /// Per key: slide index of its lowercase character, or -1.
    slide_char_index: Vec<i32>,
    positions: Vec<(f32, f32)>,
    key_spacing: f32,
}

impl KeyLayout {
    pub fn new(keys: Vec<KeyCode>, positions: Vec<(f32, f32)>, key_spacing: f32) -> Self {
        assert_eq!(keys.len(), positions.len(), "one position per key");
        assert!(key_spacing > 0.0, "key spacing must be positive");
        let classes = keys.iter().map(|key| classify(*key)).collect();
        let slide_char_index = keys
            .iter()
            .map(|key| match key {
                KeyCode::Char(c) => {
                    let lower = c.to_lowercase().next().unwrap_or(*c);
                    if lower.is_ascii() {
                        slide_index(lower as u8).map_or(-1, |i| i as i32)
                    } else {
                        -1
                    }
                }
                _ => -1,
            })
            .collect();
        Self {
            keys,
            classes,
            slide_char_index,
            positions,
            key_spacing,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, index: usize) -> KeyCode {
        self.keys[index]
    }

    pub fn class(&self, index: usize) -> KeyClass {
        self.classes[index]
    }

    pub fn position(&self, index: usize) -> (f32, f32) {
        self.positions[index]
    }

    pub fn key_spacing(&self) -> f32 {
        self.key_spacing
    }

    /// Slide index of the key at `index`, or None for keys that cannot be
    /// part of a trace.
    pub fn slide_char(&self, index: usize) -> Option<usize> {
        let i = self.slide_char_index[index];
        (i >= 0).then(|| i as usize)
    }

    /// Key index carrying a given slide character, if the layout has one.
    pub fn key_for_slide_char(&self, slide: usize) -> Option<usize> {
        self.slide_char_index.iter().position(|&i| i == slide as i32)
    }

    /// Normalized distance from (x, y) to each slide character's key, with a
    /// half-key dead zone subtracted so anywhere on the key itself counts as
    /// distance zero. `f32::MAX` for characters without a key.
    pub fn key_distances(&self, x: f32, y: f32) -> [f32; SLIDE_CHAR_COUNT] {
        let mut distances = [f32::MAX; SLIDE_CHAR_COUNT];
        let scale = 1.0 / (self.key_spacing * self.key_spacing);
        for (i, &(kx, ky)) in self.positions.iter().enumerate() {
            if let Some(slide) = self.slide_char(i) {
                let d2 = (kx - x) * (kx - x) + (ky - y) * (ky - y);
                let dist = ((scale * d2).sqrt() - 0.5).max(0.0);
                distances[slide] = distances[slide].min(dist);
            }
        }
        distances
    }

    /// Nearest key to (x, y) by raw pixel distance, or None when the nearest
    /// key is farther than one key-spacing. Used by the single-tap fallback.
    pub fn nearest_key(&self, x: f32, y: f32) -> Option<(usize, f32)> {
        let mut nearest = None;
        let mut nearest_distance = f32::MAX;
        for (i, &(kx, ky)) in self.positions.iter().enumerate() {
            let dist = ((kx - x) * (kx - x) + (ky - y) * (ky - y)).sqrt();
            if dist < nearest_distance {
                nearest = Some(i);
                nearest_distance = dist;
            }
        }
        let index = nearest?;
        (nearest_distance <= self.key_spacing).then_some((index, nearest_distance))
    }

    /// The bundled English layout: a 5x7 grid with the common letters in the
    /// middle rows, spacing 100. Binaries and tests use it as a default;
    /// production callers supply their own geometry.
    pub fn english() -> Self {
        use KeyCode::*;
        let keys = vec![
            Char('?'), Char('x'), Char('w'), Char('v'), Char('y'), Char('b'), Delete,
            Char(','), Char('t'), Char('h'), Char('e'), Char('r'), Char('m'), Char(' '),
            Char('.'), Char('c'), Char('a'), Char('i'), Char('o'), Char('l'), Char('p'),
            Alt, Char('k'), Char('s'), Char('n'), Char('u'), Char('d'), Char('j'),
            Shift, Char('z'), Char('\''), Char('g'), Char('f'), Char('q'), Enter,
        ];
        let spacing = 100.0;
        let positions = (0..keys.len())
            .map(|i| {
                let col = (i % 7) as f32;
                let row = (i / 7) as f32;
                (col * spacing + spacing / 2.0, row * spacing + spacing / 2.0)
            })
            .collect();
        Self::new(keys, positions, spacing)
    }
}

fn classify(key: KeyCode) -> KeyClass {
    match key {
        KeyCode::Char(c) => {
            let lower = c.to_lowercase().next().unwrap_or(c);
            if c.is_ascii_digit() {
                KeyClass::Number
            } else if matches!(lower, 'a' | 'e' | 'i' | 'o' | 'u') {
                KeyClass::Vowel
            } else if c.is_alphabetic() {
                KeyClass::Consonant
            } else {
                KeyClass::Punctuation
            }
        }
        _ => KeyClass::Control,
    }
}

/// The slide character at a given slide index, as a trace-spelling byte.
pub fn slide_char_at(slide: usize) -> u8 {
    SLIDE_CHARS[slide]
}
