//! Logging initialization.
//!
//! Wraps the observability crate: structured JSONL goes to
//! `~/.twgrabber/logs/twgrabber.jsonl` (or the given directory), with a
//! compact copy on stderr.

use crate::Paths;

pub use observability::LogConfig;

const SERVICE_NAME: &str = "twgrabber";

/// Initialize logging at `level`, writing the log file under `paths`.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: &str, paths: &Paths) {
    observability::init_with_config(log_config(level, paths));
}

fn log_config(level: &str, paths: &Paths) -> LogConfig {
    LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: normalize_level(level).into(),
        log_path: Some(paths.log_file()),
        also_stderr: true,
    }
}

/// Map a user-supplied level to a filter directive, defaulting to info.
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        "off" => "off",
        _ => "info",
    }
}
