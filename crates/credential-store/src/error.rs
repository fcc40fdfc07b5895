//! Credential validation errors.

use std::path::PathBuf;
use thiserror::Error;

/// Error raised while loading a credential file.
///
/// Every variant is fatal: a typo in a secret name must never proceed with a
/// partial identity.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A line named a field outside the recognized set.
    #[error("unknown credential field: {0}")]
    UnknownField(String),

    /// One or more required fields were never set (or set to an empty value).
    #[error("incomplete credentials, missing: {}", missing.join(", "))]
    IncompleteCredentials {
        /// Names of the fields that were not provided.
        missing: Vec<&'static str>,
    },

    /// A non-blank line did not contain `=`.
    #[error("malformed credential line {line}: expected `name = value`")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
    },

    /// The credential source could not be read.
    #[error("failed to read credentials from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
