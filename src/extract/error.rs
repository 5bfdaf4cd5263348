//! Error types for the extract module

use crate::error::Error as CrateError;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for page extraction
///
/// Every variant is local to one page or directory; the run logs it and
/// moves on.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The page file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The page is not valid UTF-8
    #[error("{} is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },

    /// The page produced no extract
    #[error("No content extracted from {url}")]
    EmptyPage { url: String },

    /// A dump directory could not be listed
    #[error("Failed to list {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl From<ExtractError> for CrateError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Io { source, .. } => CrateError::Io(source),
            _ => CrateError::Extract(err.to_string()),
        }
    }
}
