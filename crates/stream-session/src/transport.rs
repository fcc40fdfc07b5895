//! Transport abstraction between a session and the stream endpoint.

use crate::FilterSpec;
use async_trait::async_trait;
use bytes::Bytes;
use credential_store::CredentialSet;
use futures_util::stream::BoxStream;
use reconnect_policy::TransportError;

/// One unit read from an open stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUnit {
    /// A complete record payload, persisted verbatim.
    Record(Bytes),
    /// Keep-alive; proves liveness, carries nothing.
    KeepAlive,
    /// The stream failed mid-read.
    Signal(TransportError),
}

/// Units of one connection, in arrival order. Ends when the remote closes.
pub type InboundStream = BoxStream<'static, InboundUnit>;

/// Opens authenticated, filtered stream connections.
#[async_trait]
pub trait StreamTransport: Send {
    /// Open one connection. Errors here never yield any units.
    async fn connect(
        &mut self,
        credentials: &CredentialSet,
        filter: &FilterSpec,
    ) -> Result<InboundStream, TransportError>;
}
