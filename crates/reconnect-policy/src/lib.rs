//! Reconnection policy for the filtered stream.
//!
//! Classifies a [`TransportError`] into a [`Disposition`]: retry after a
//! delay, or stop. Authentication and malformed-request failures are never
//! retried; everything else backs off exponentially per error class.

mod error;
mod policy;

pub use error::{ErrorClass, TransportError};
pub use policy::{BackoffConfig, Disposition, FatalCause, ReconnectPolicy};
