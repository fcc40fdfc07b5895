//! Capture sink for the stream grabber.
//!
//! Provides:
//! - [`RecordSink`], the capability a session writes records through
//! - [`SinkHandle`], a truncate-on-open, write-through file sink
//! - [`MemorySink`], an in-memory sink with failure injection

mod error;
mod sink;

pub use error::{SinkError, SinkResult};
pub use sink::{MemorySink, RecordSink, SinkHandle, SinkStats};
