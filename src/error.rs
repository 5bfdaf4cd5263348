//! Error types for the sitedump crate

use thiserror::Error;

/// Result type for sitedump operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sitedump operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or validated
    #[error("Config error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Page extraction error
    #[error("Extract error: {0}")]
    Extract(String),

    /// Content rewrite error
    #[error("Rewrite error: {0}")]
    Rewrite(String),

    /// Output could not be written
    #[error("Write error: {0}")]
    Write(String),
}
