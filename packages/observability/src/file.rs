//! JSONL file output and subscriber installation.
//!
//! The log file is opened in append mode and flushed after every line, so
//! concurrent captures can share one file and `tail -f` sees lines promptly.

use crate::json_layer::JsonLayer;
use crate::{InitError, LogConfig};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `~/.twgrabber/logs/twgrabber.jsonl`, if the home directory is known.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".twgrabber").join("logs").join("twgrabber.jsonl"))
}

/// Shared append-only writer for the log file.
#[derive(Clone)]
pub struct LogFileWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl LogFileWriter {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the JSONL file layer plus optional stderr layer.
pub(crate) fn try_install(config: &LogConfig) -> Result<PathBuf, InitError> {
    let log_path = config
        .log_path
        .clone()
        .or_else(default_log_path)
        .ok_or(InitError::NoLogPath)?;

    let writer = LogFileWriter::open(&log_path).map_err(|source| InitError::Open {
        path: log_path.clone(),
        source,
    })?;

    let json_layer = JsonLayer::new(config.service_name.clone(), writer);
    let stderr = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    tracing_subscriber::registry()
        .with(json_layer.with_filter(env_filter(&config.default_level)))
        .with(stderr)
        .try_init()
        .map_err(|_| InitError::AlreadyInstalled)?;

    Ok(log_path)
}

/// Install only the stderr layer.
pub(crate) fn install_stderr_only(config: &LogConfig) -> Result<(), InitError> {
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .with_filter(env_filter(&config.default_level));

    tracing_subscriber::registry()
        .with(stderr)
        .try_init()
        .map_err(|_| InitError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writer_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deeply").join("nested").join("test.jsonl");

        assert!(LogFileWriter::open(&path).is_ok());
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn test_writer_appends_and_flushes_each_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        std::fs::write(&path, "existing\n").unwrap();

        let mut writer = LogFileWriter::open(&path).unwrap();
        writer.write_all(b"first\n").unwrap();
        // Visible without an explicit flush or drop.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\nfirst\n");

        let mut clone = writer.make_writer();
        clone.write_all(b"second\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "existing\nfirst\nsecond\n"
        );
    }

    #[test]
    fn test_default_log_path_location() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with(".twgrabber/logs/twgrabber.jsonl"));
        }
    }
}
