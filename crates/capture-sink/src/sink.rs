//! File-backed capture sink.

use crate::{SinkError, SinkResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Running totals for a sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Records appended.
    pub records: u64,
    /// Bytes appended.
    pub bytes: u64,
}

/// Destination for received records.
///
/// Implementations must persist records in call order and must not
/// interpret their content.
pub trait RecordSink: Send {
    /// Append one record verbatim.
    fn append(&mut self, record: &[u8]) -> SinkResult<()>;

    /// Flush and release the destination. Further appends fail with
    /// [`SinkError::Closed`]. Calling `finish` twice is a no-op.
    fn finish(&mut self) -> SinkResult<()>;

    /// Totals so far.
    fn stats(&self) -> SinkStats;
}

/// Exclusive handle on one open output file.
///
/// The file is truncated on open. Records go straight to the OS with
/// `write_all`; nothing is held in an engine-side buffer.
#[derive(Debug)]
pub struct SinkHandle {
    path: PathBuf,
    file: Option<File>,
    stats: SinkStats,
}

impl SinkHandle {
    /// Create (or truncate) the destination file.
    pub fn open(destination: impl AsRef<Path>) -> SinkResult<Self> {
        let path = destination.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), "Opened capture sink");

        Ok(Self {
            path,
            file: Some(file),
            stats: SinkStats::default(),
        })
    }

    /// Path of the destination.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the handle still owns an open file.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Finish the sink and return its totals.
    pub fn close(mut self) -> SinkResult<SinkStats> {
        self.finish()?;
        Ok(self.stats)
    }
}

impl RecordSink for SinkHandle {
    fn append(&mut self, record: &[u8]) -> SinkResult<()> {
        let file = self.file.as_mut().ok_or(SinkError::Closed)?;
        file.write_all(record).map_err(|source| SinkError::Write {
            path: self.path.clone(),
            source,
        })?;

        self.stats.records += 1;
        self.stats.bytes += record.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        file.flush()
            .and_then(|_| file.sync_all())
            .map_err(|source| SinkError::Sync {
                path: self.path.clone(),
                source,
            })?;

        info!(
            path = %self.path.display(),
            records = self.stats.records,
            bytes = self.stats.bytes,
            "Closed capture sink"
        );
        Ok(())
    }

    fn stats(&self) -> SinkStats {
        self.stats
    }
}

impl Drop for SinkHandle {
    fn drop(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                warn!(path = %self.path.display(), error = %e, "Failed to flush sink on drop");
            }
            debug!(path = %self.path.display(), "Sink dropped without close");
        }
    }
}

/// In-memory sink whose contents stay readable after the sink is consumed.
///
/// Useful for exercising a session without touching the filesystem. A
/// failure can be injected after a fixed number of successful appends.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
    finished: Arc<Mutex<bool>>,
    stats: SinkStats,
    fail_after: Option<u64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every append after `records` successful ones.
    pub fn failing_after(records: u64) -> Self {
        Self {
            fail_after: Some(records),
            ..Self::default()
        }
    }

    /// Snapshot of everything appended so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    /// Whether `finish` has been called on this sink or any clone of it.
    pub fn is_finished(&self) -> bool {
        *self.finished.lock()
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &[u8]) -> SinkResult<()> {
        if self.is_finished() {
            return Err(SinkError::Closed);
        }
        if self.fail_after.is_some_and(|limit| self.stats.records >= limit) {
            return Err(SinkError::Write {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected write failure"),
            });
        }

        self.buffer.lock().extend_from_slice(record);
        self.stats.records += 1;
        self.stats.bytes += record.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        *self.finished.lock() = true;
        Ok(())
    }

    fn stats(&self) -> SinkStats {
        self.stats
    }
}
