//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed record in a JSON-lines stream.
    #[error("line {line}: {source}")]
    Record {
        /// 1-based line number.
        line: usize,
        /// Parser error.
        source: serde_json::Error,
    },

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] blipreco_core::Error),
}
