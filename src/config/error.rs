//! Error types for the config module

use crate::error::Error as CrateError;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised while loading or validating configuration
///
/// Every variant is raised before the first page is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config or redirect file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config or redirect file is not valid JSON of the expected shape
    #[error("Failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required site field is absent
    #[error("Site '{site}' is missing required field '{field}'")]
    MissingField { site: String, field: &'static str },

    /// A CSS or simple selector does not parse
    #[error("Site '{site}' has an invalid selector '{selector}': {reason}")]
    InvalidSelector {
        site: String,
        selector: String,
        reason: String,
    },

    /// A regular expression does not compile
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A hook is referenced by a name that is not implemented
    #[error("Unknown {kind} function '{name}'")]
    UnknownFunction { kind: &'static str, name: String },

    /// The base url does not parse
    #[error("Site '{site}' has an invalid base url: {source}")]
    InvalidUrl {
        site: String,
        #[source]
        source: url::ParseError,
    },

    /// Two sites share a name
    #[error("Site '{0}' is declared more than once")]
    DuplicateSite(String),

    /// A numeric setting is out of range
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<ConfigError> for CrateError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { source, .. } => CrateError::Io(source),
            _ => CrateError::Config(err.to_string()),
        }
    }
}
