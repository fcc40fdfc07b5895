//! Session-level errors.

use crate::FilterError;
use capture_sink::SinkError;
use reconnect_policy::TransportError;
use thiserror::Error;

/// Why a session terminated without being cancelled.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("credentials rejected: {0}")]
    Authentication(TransportError),

    #[error("stream request rejected: {0}")]
    Rejected(TransportError),

    #[error("failed to persist record: {0}")]
    Persistence(#[from] SinkError),

    #[error("gave up after {attempts} reconnect attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: TransportError },

    #[error("invalid session transition: {0}")]
    State(String),
}

impl SessionError {
    /// Short name of the stage that failed, for user-facing messages.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Filter(_) => "filter",
            Self::Authentication(_) => "authentication",
            Self::Rejected(_) => "request",
            Self::Persistence(_) => "persistence",
            Self::RetriesExhausted { .. } | Self::State(_) => "reconnection",
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
