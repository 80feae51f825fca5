use thiserror::Error;

use crate::types::PathKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Generation failed on {path} path: {message}")]
    GenerationFailure { path: PathKind, message: String },

    /// Internal bookkeeping disagreed with itself (e.g. segment/embedding counts).
    #[error("Internal consistency violation: {0}")]
    Inconsistent(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fatal errors indicate a broken setup rather than a transient condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::DimensionMismatch { .. } | Error::Inconsistent(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
