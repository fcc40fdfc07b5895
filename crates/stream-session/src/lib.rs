//! Filtered-stream session.
//!
//! A [`StreamSession`] opens an authenticated connection through a
//! [`StreamTransport`], appends every record to a [`capture_sink::RecordSink`]
//! in arrival order, and reconnects on failure as the
//! [`reconnect_policy::ReconnectPolicy`] directs. It stops when the shutdown
//! channel fires or on a fatal error.

mod error;
mod filter;
mod framing;
mod fsm;
mod http;
mod oauth;
mod session;
mod transport;

#[cfg(test)]
mod tests;

pub use error::{SessionError, SessionResult};
pub use filter::{FilterError, FilterSpec};
pub use framing::{Frame, LengthDelimitedFramer, MAX_RECORD_LEN};
pub use fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionState};
pub use http::{HttpStreamTransport, HttpTransportConfig, DEFAULT_STREAM_URL, DEFAULT_USER_AGENT};
pub use oauth::{percent_encode, OAuthSigner};
pub use session::{
    SessionConfig, SessionReport, StreamSession, DEFAULT_CONNECT_TIMEOUT, DEFAULT_STALL_TIMEOUT,
};
pub use transport::{InboundStream, InboundUnit, StreamTransport};
