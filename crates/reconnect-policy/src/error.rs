//! Transport-level failures observed by a stream session.

use std::time::Duration;
use thiserror::Error;

/// A failure to connect to, or keep reading from, the stream endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Credentials were rejected (invalid, revoked, or not permitted).
    #[error("authentication rejected (HTTP {status}): {message}")]
    AuthRejected { status: u16, message: String },

    /// The request itself was refused, e.g. an empty or oversized track list.
    #[error("request rejected (HTTP {status}): {message}")]
    BadRequest { status: u16, message: String },

    /// The endpoint is throttling this client.
    #[error("rate limited (HTTP {status})")]
    RateLimited {
        status: u16,
        /// Server-provided `Retry-After`, if any.
        retry_after: Option<Duration>,
    },

    /// The endpoint returned a 5xx status.
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Connection refused, reset, TLS failure, DNS failure, or similar.
    #[error("network error: {0}")]
    Network(String),

    /// No bytes arrived within the stall timeout.
    #[error("stream stalled: no data for {0:?}")]
    Stalled(Duration),

    /// The remote end closed the stream.
    #[error("stream closed by remote")]
    Closed,

    /// A status or signal that fits no other category.
    #[error("unexpected stream signal: {0}")]
    Unknown(String),
}

/// Coarse category used to pick a backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Auth,
    Request,
    RateLimit,
    Server,
    Network,
    Unknown,
}

impl TransportError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(
        status: u16,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::AuthRejected { status, message },
            400 | 404 | 406 | 413 | 416 => Self::BadRequest { status, message },
            420 | 429 => Self::RateLimited { status, retry_after },
            500..=599 => Self::Server { status, message },
            _ => Self::Unknown(format!("HTTP {status}: {message}")),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::AuthRejected { .. } => ErrorClass::Auth,
            Self::BadRequest { .. } => ErrorClass::Request,
            Self::RateLimited { .. } => ErrorClass::RateLimit,
            Self::Server { .. } => ErrorClass::Server,
            Self::Network(_) | Self::Stalled(_) | Self::Closed => ErrorClass::Network,
            Self::Unknown(_) => ErrorClass::Unknown,
        }
    }

    /// Server-provided delay hint.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
