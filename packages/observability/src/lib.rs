//! # Observability
//!
//! Structured logging for twgrabber.
//!
//! The binary calls [`init_with_config`] once at startup; every crate then
//! uses plain `tracing` macros. Events go to a JSONL file
//! (`~/.twgrabber/logs/twgrabber.jsonl` by default), one object per line, and
//! optionally to a compact stderr layer.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "twgrabber".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!(keywords = 3, "starting capture");
//! ```
//!
//! `tail -f ~/.twgrabber/logs/twgrabber.jsonl | jq` follows a running capture.

mod file;
mod json_layer;

use std::path::PathBuf;
use thiserror::Error;

pub use file::{default_log_path, LogFileWriter};
pub use json_layer::{JsonLayer, LogEntry};

/// Logging could not be installed as requested.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("no log path given and home directory is unknown")]
    NoLogPath,

    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Included in every log line as `service`.
    pub service_name: String,

    /// Default level filter, e.g. "debug". `RUST_LOG` takes precedence.
    pub default_level: String,

    /// Log file path. Defaults to `~/.twgrabber/logs/twgrabber.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging, falling back to stderr-only output when the log
/// file cannot be opened. Never panics; a second call is a no-op.
pub fn init_with_config(config: LogConfig) {
    match file::try_install(&config) {
        Ok(path) => {
            tracing::debug!(log_path = %path.display(), "observability initialized");
        }
        Err(InitError::AlreadyInstalled) => {}
        Err(e) => {
            if file::install_stderr_only(&config).is_ok() {
                tracing::warn!(error = %e, "log file unavailable, logging to stderr only");
            }
        }
    }
}
