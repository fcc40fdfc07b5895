//! Sink error types.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence failure. Any of these aborts a capture session.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The destination could not be created or truncated.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be written.
    #[error("failed to write to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Flushing or syncing on close failed.
    #[error("failed to sync {}: {source}", path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sink was already finished.
    #[error("sink is closed")]
    Closed,
}

/// Result type alias using SinkError.
pub type SinkResult<T> = Result<T, SinkError>;
