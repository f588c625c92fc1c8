// src/error.rs
use thiserror::Error;

/// Failures while loading or storing the files the engine works from: the
/// user dictionary and key layout configs. Corpus problems are not errors —
/// a missing or truncated corpus degrades to a smaller (possibly empty)
/// dictionary instead.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("user dictionary encoding failed: {0}")]
    Dictionary(#[from] bincode::Error),
    #[error("layout config is invalid: {0}")]
    LayoutConfig(#[from] serde_json::Error),
}
