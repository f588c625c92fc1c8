// src/lib.rs

pub mod core;
pub mod error;
pub mod persistence;

pub use crate::core::dictionary::DictionaryIndex;
pub use crate::core::engine::ImeEngine;
pub use crate::core::layout::{KeyClass, KeyCode, KeyLayout};
pub use crate::core::matcher::Matcher;
pub use crate::core::trace::{trace_for_word, TraceBuilder};
pub use crate::core::types::{ShiftState, TracePoint, TracedKey};
pub use crate::error::PersistenceError;
