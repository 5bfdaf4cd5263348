//! Error types for the preprocess module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for content rewrites
#[derive(Debug, Error)]
pub enum RewriteError {
    /// A data row came before any header row in a table that needs headers
    #[error("Row {row} has no headers to pair its cells with")]
    MissingHeaders { row: usize },

    /// A data row has more cells than the header row
    #[error("Row {row} has {cells} cells but only {headers} headers")]
    HeaderMismatch {
        row: usize,
        cells: usize,
        headers: usize,
    },
}

impl From<RewriteError> for CrateError {
    fn from(err: RewriteError) -> Self {
        CrateError::Rewrite(err.to_string())
    }
}
