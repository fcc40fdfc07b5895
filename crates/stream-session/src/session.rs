//! The stream session: connect, persist, reconnect, until cancelled or fatal.

use crate::error::{SessionError, SessionResult};
use crate::fsm::{SessionMachine, SessionMachineInput, SessionState};
use crate::transport::{InboundUnit, StreamTransport};
use crate::FilterSpec;
use capture_sink::RecordSink;
use credential_store::CredentialSet;
use futures_util::StreamExt;
use reconnect_policy::{Disposition, FatalCause, ReconnectPolicy, TransportError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Longest silence (no record, no keep-alive) before the connection is dropped.
    pub stall_timeout: Duration,
    /// Longest wait for the subscribe handshake to produce a response.
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Counters for a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Records appended to the sink.
    pub records: u64,
    /// Payload bytes appended to the sink.
    pub bytes: u64,
    pub keepalives: u64,
    /// Connection attempts, successful or not.
    pub connect_attempts: u32,
    /// Connections that reached streaming.
    pub connections: u32,
    pub reconnects: u32,
}

/// How one connection ended.
enum ConnectionEnd {
    Failed(TransportError),
    Cancelled,
}

pub struct StreamSession<T> {
    credentials: CredentialSet,
    filter: FilterSpec,
    transport: T,
    policy: ReconnectPolicy,
    config: SessionConfig,
    machine: SessionMachine,
    report: SessionReport,
}

impl<T: StreamTransport> StreamSession<T> {
    pub fn new(
        credentials: CredentialSet,
        filter: FilterSpec,
        transport: T,
        policy: ReconnectPolicy,
    ) -> Self {
        Self::with_config(credentials, filter, transport, policy, SessionConfig::default())
    }

    pub fn with_config(
        credentials: CredentialSet,
        filter: FilterSpec,
        transport: T,
        policy: ReconnectPolicy,
        config: SessionConfig,
    ) -> Self {
        Self {
            credentials,
            filter,
            transport,
            policy,
            config,
            machine: SessionMachine::new(),
            report: SessionReport::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from(self.machine.state())
    }

    pub fn report(&self) -> SessionReport {
        self.report
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    /// Run until `shutdown` fires or a fatal error occurs.
    ///
    /// Cancellation returns `Ok` with the final counters. The sink is
    /// finished on every exit path; a finish failure after an otherwise
    /// clean run is reported as a persistence error.
    pub async fn run<S: RecordSink>(
        &mut self,
        sink: &mut S,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> SessionResult<SessionReport> {
        let outcome = self.drive(sink, shutdown).await;
        let finished = sink.finish();

        match (outcome, finished) {
            (Ok(()), Ok(())) => {
                info!(
                    records = self.report.records,
                    bytes = self.report.bytes,
                    reconnects = self.report.reconnects,
                    "Session stopped"
                );
                Ok(self.report)
            }
            (Ok(()), Err(e)) => {
                error!(error = %e, "Failed to finish sink");
                Err(SessionError::Persistence(e))
            }
            (Err(e), finished) => {
                if let Err(finish_error) = finished {
                    warn!(error = %finish_error, "Failed to finish sink after session error");
                }
                error!(stage = e.stage(), error = %e, "Session terminated");
                Err(e)
            }
        }
    }

    async fn drive<S: RecordSink>(
        &mut self,
        sink: &mut S,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> SessionResult<()> {
        self.transition(SessionMachineInput::Start)?;

        loop {
            self.report.connect_attempts += 1;
            info!(
                attempt = self.report.connect_attempts,
                track = %self.filter.track_param(),
                "Connecting to stream"
            );

            let connect_timeout = self.config.connect_timeout;
            let handshake = tokio::time::timeout(
                connect_timeout,
                self.transport.connect(&self.credentials, &self.filter),
            );
            let connected = tokio::select! {
                biased;
                _ = shutdown.recv() => None,
                result = handshake => Some(result),
            };

            let end = match connected {
                None => ConnectionEnd::Cancelled,
                Some(Err(_)) => {
                    warn!(
                        timeout_secs = connect_timeout.as_secs(),
                        "Subscribe handshake timed out"
                    );
                    ConnectionEnd::Failed(TransportError::Network(format!(
                        "no response to subscribe within {connect_timeout:?}"
                    )))
                }
                Some(Ok(Err(e))) => ConnectionEnd::Failed(e),
                Some(Ok(Ok(mut inbound))) => {
                    self.transition(SessionMachineInput::Subscribed)?;
                    self.report.connections += 1;
                    self.policy.record_connected(Instant::now());
                    info!("Streaming");

                    let stall_timeout = self.config.stall_timeout;
                    loop {
                        let next = tokio::select! {
                            biased;
                            _ = shutdown.recv() => break ConnectionEnd::Cancelled,
                            next = tokio::time::timeout(stall_timeout, inbound.next()) => next,
                        };

                        match next {
                            Err(_) => {
                                warn!(timeout_secs = stall_timeout.as_secs(), "Stream stalled");
                                break ConnectionEnd::Failed(TransportError::Stalled(stall_timeout));
                            }
                            Ok(None) => break ConnectionEnd::Failed(TransportError::Closed),
                            Ok(Some(InboundUnit::Signal(e))) => break ConnectionEnd::Failed(e),
                            Ok(Some(InboundUnit::KeepAlive)) => {
                                self.policy.record_activity(Instant::now());
                                self.report.keepalives += 1;
                                trace!("Keep-alive");
                            }
                            Ok(Some(InboundUnit::Record(record))) => {
                                self.policy.record_activity(Instant::now());
                                if let Err(e) = sink.append(&record) {
                                    self.transition(SessionMachineInput::Abort)?;
                                    return Err(SessionError::Persistence(e));
                                }
                                self.report.records += 1;
                                self.report.bytes += record.len() as u64;
                                trace!(len = record.len(), "Record persisted");
                            }
                        }
                    }
                }
            };

            let failure = match end {
                ConnectionEnd::Cancelled => {
                    info!("Shutdown requested");
                    self.transition(SessionMachineInput::Cancel)?;
                    return Ok(());
                }
                ConnectionEnd::Failed(e) => e,
            };

            self.transition(SessionMachineInput::Failed)?;
            match self.policy.classify(&failure) {
                Disposition::Fatal(cause) => {
                    self.transition(SessionMachineInput::Abort)?;
                    return Err(fatal_error(failure, cause));
                }
                Disposition::Retry(delay) => {
                    warn!(
                        error = %failure,
                        delay_ms = delay.as_millis() as u64,
                        "Stream lost, reconnecting"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => {
                            info!("Shutdown requested during backoff");
                            self.transition(SessionMachineInput::Cancel)?;
                            return Ok(());
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    self.transition(SessionMachineInput::Retry)?;
                    self.report.reconnects += 1;
                }
            }
        }
    }

    fn transition(&mut self, input: SessionMachineInput) -> SessionResult<()> {
        let from = *self.machine.state();
        self.machine
            .consume(&input)
            .map_err(|_| SessionError::State(format!("{from:?} cannot accept {input:?}")))?;
        debug!(from = ?from, to = ?self.machine.state(), "Session transition");
        Ok(())
    }
}

fn fatal_error(failure: TransportError, cause: FatalCause) -> SessionError {
    match cause {
        FatalCause::RetriesExhausted { attempts } => SessionError::RetriesExhausted {
            attempts,
            last: failure,
        },
        FatalCause::NonRetryable => match failure {
            TransportError::AuthRejected { .. } => SessionError::Authentication(failure),
            other => SessionError::Rejected(other),
        },
    }
}
