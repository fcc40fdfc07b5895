//! Configuration, paths, and logging setup for twgrabber.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, normalize_level, LogConfig};
pub use paths::Paths;
