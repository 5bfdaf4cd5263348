//! Error types for the writer module

use crate::error::Error as CrateError;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for corpus output
#[derive(Debug, Error)]
pub enum WriteError {
    /// An output file or directory could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialized
    #[error("Failed to serialize {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<WriteError> for CrateError {
    fn from(err: WriteError) -> Self {
        CrateError::Write(err.to_string())
    }
}
