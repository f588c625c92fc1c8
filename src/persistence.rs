// File: src/persistence.rs
use crate::core::dictionary::cmp_words_ci;
use crate::core::layout::KeyLayout;
use crate::error::PersistenceError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads a corpus stream: records of (length byte, length UTF-16 code units
/// big-endian, frequency byte) until end of stream. A record cut short ends
/// the corpus; everything read up to that point is kept.
pub fn read_corpus<R: Read>(reader: R) -> Vec<(String, u8)> {
    let mut reader = BufReader::new(reader);
    let mut words = Vec::new();
    loop {
        let mut len_buf = [0u8; 1];
        if reader.read_exact(&mut len_buf).is_err() {
            break;
        }
        let mut units = vec![0u8; usize::from(len_buf[0]) * 2];
        let mut freq_buf = [0u8; 1];
        if reader.read_exact(&mut units).is_err() || reader.read_exact(&mut freq_buf).is_err() {
            warn!("corpus stream ended mid-record; keeping {} words", words.len());
            break;
        }
        let code_units: Vec<u16> = units
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        words.push((String::from_utf16_lossy(&code_units), freq_buf[0]));
    }
    words
}

/// Writes a corpus stream in the format `read_corpus` consumes. Words whose
/// UTF-16 form exceeds the length byte are skipped.
pub fn write_corpus<W: Write>(writer: W, entries: &[(String, u8)]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(writer);
    for (word, frequency) in entries {
        let units: Vec<u16> = word.encode_utf16().collect();
        let Ok(len) = u8::try_from(units.len()) else {
            warn!("skipping corpus word of {} code units: {}", units.len(), word);
            continue;
        };
        writer.write_all(&[len])?;
        for unit in units {
            writer.write_all(&unit.to_be_bytes())?;
        }
        writer.write_all(&[*frequency])?;
    }
    writer.flush()
}

/// The words a user has added, kept sorted in the same order the corpus
/// uses so index builds can merge the two lists in one pass. Stored as a
/// single bincode file written atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDictionary {
    entries: Vec<(String, u8)>,
}

impl UserDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(String, u8)] {
        &self.entries
    }

    /// Adds a word with a frequency clamped to the corpus scale, keeping the
    /// list sorted. Re-adding a word updates its frequency.
    pub fn insert(&mut self, word: &str, frequency: i64) {
        let frequency = frequency.clamp(0, 255) as u8;
        let at = self
            .entries
            .partition_point(|(w, _)| cmp_words_ci(w, word) == Ordering::Less);
        let mut i = at;
        while i < self.entries.len() && cmp_words_ci(&self.entries[i].0, word) == Ordering::Equal {
            if self.entries[i].0 == word {
                self.entries[i].1 = frequency;
                return;
            }
            i += 1;
        }
        self.entries.insert(at, (word.to_string(), frequency));
    }

    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(bincode::deserialize_from(reader)?)
    }

    /// Write-then-persist through a temp file in the same directory, so a
    /// crash mid-save never leaves a half-written dictionary behind.
    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let temp = NamedTempFile::new_in(parent)?;
        let writer = BufWriter::new(&temp);
        bincode::serialize_into(writer, self)?;
        temp.persist(path).map_err(|e| PersistenceError::Io(e.error))?;
        Ok(())
    }
}

/// Loads a key layout from its JSON config form.
pub fn load_layout(path: &Path) -> Result<KeyLayout, PersistenceError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Writes a key layout as editable JSON, atomically like the dictionary.
pub fn save_layout(layout: &KeyLayout, path: &Path) -> Result<(), PersistenceError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let temp = NamedTempFile::new_in(parent)?;
    let writer = BufWriter::new(&temp);
    serde_json::to_writer_pretty(writer, layout)?;
    temp.persist(path).map_err(|e| PersistenceError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_round_trip() {
        let entries = vec![
            ("apple".to_string(), 200),
            ("café".to_string(), 130),
            ("zebra".to_string(), 1),
        ];
        let mut buf = Vec::new();
        write_corpus(&mut buf, &entries).unwrap();
        assert_eq!(read_corpus(&buf[..]), entries);
    }

    #[test]
    fn truncated_corpus_keeps_complete_records() {
        let entries = vec![("one".to_string(), 10), ("two".to_string(), 20)];
        let mut buf = Vec::new();
        write_corpus(&mut buf, &entries).unwrap();
        // cut into the middle of the second record
        buf.truncate(buf.len() - 3);
        let read = read_corpus(&buf[..]);
        assert_eq!(read, vec![("one".to_string(), 10)]);
    }

    #[test]
    fn empty_corpus_reads_as_no_words() {
        assert!(read_corpus(std::io::empty()).is_empty());
    }

    #[test]
    fn user_dictionary_insert_sorts_and_clamps() {
        let mut dict = UserDictionary::new();
        dict.insert("zeta", 9999);
        dict.insert("alpha", -5);
        dict.insert("midway", 100);
        let entries = dict.entries();
        assert_eq!(entries[0], ("alpha".to_string(), 0));
        assert_eq!(entries[1], ("midway".to_string(), 100));
        assert_eq!(entries[2], ("zeta".to_string(), 255));
        dict.insert("midway", 7);
        assert_eq!(dict.entries().len(), 3);
        assert_eq!(dict.entries()[1], ("midway".to_string(), 7));
    }

    #[test]
    fn user_dictionary_survives_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_dictionary.bin");
        let mut dict = UserDictionary::new();
        dict.insert("gesture", 42);
        dict.insert("trace", 7);
        dict.save(&path).unwrap();
        let loaded = UserDictionary::load(&path).unwrap();
        assert_eq!(loaded.entries(), dict.entries());
    }

    #[test]
    fn layout_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        let layout = KeyLayout::english();
        save_layout(&layout, &path).unwrap();
        let loaded = load_layout(&path).unwrap();
        assert_eq!(loaded.len(), layout.len());
        assert_eq!(loaded.key_spacing(), layout.key_spacing());
        assert_eq!(loaded.key(0), layout.key(0));
    }
}
