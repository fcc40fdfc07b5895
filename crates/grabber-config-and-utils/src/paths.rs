//! File system paths.

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Locations of twgrabber's own files (not captures).
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.twgrabber)
    base_dir: PathBuf,
}

impl Paths {
    /// Paths rooted at `~/.twgrabber`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;
        Ok(Self {
            base_dir: home.join(".twgrabber"),
        })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// ~/.twgrabber/config.json
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// ~/.twgrabber/logs
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// ~/.twgrabber/logs/twgrabber.jsonl
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("twgrabber.jsonl")
    }
}
