//! Reconnect decisions and backoff schedule.

use crate::{ErrorClass, TransportError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Backoff settings for reconnection.
///
/// Each retryable error class has its own exponential schedule:
/// `delay = initial * 2^(failures - 1)`, capped at the class maximum.
/// For the default config:
/// - network (including stalls and remote closes): 250ms, 500ms, 1s, ... 16s
/// - server (5xx): 5s, 10s, 20s, ... 320s
/// - rate limit (420/429): 60s, 120s, 240s, ... 960s
///
/// All counters reset once a connection has kept delivering data for
/// `stable_after_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub network_initial_ms: u64,
    pub network_max_ms: u64,
    pub server_initial_ms: u64,
    pub server_max_ms: u64,
    pub rate_limit_initial_ms: u64,
    pub rate_limit_max_ms: u64,
    /// Streaming time after which a connection counts as healthy.
    pub stable_after_secs: u64,
    /// Consecutive retries allowed before giving up. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            network_initial_ms: 250,
            network_max_ms: 16_000,
            server_initial_ms: 5_000,
            server_max_ms: 320_000,
            rate_limit_initial_ms: 60_000,
            rate_limit_max_ms: 960_000,
            stable_after_secs: 60,
            max_retries: None,
        }
    }
}

/// Why a session must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalCause {
    /// The error class is never retried (auth or malformed request).
    NonRetryable,
    /// The configured retry cap was reached.
    RetriesExhausted { attempts: u32 },
}

/// Outcome of classifying a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Reconnect after the given delay.
    Retry(Duration),
    /// Stop the session.
    Fatal(FatalCause),
}

#[derive(Debug, Default, Clone, Copy)]
struct FailureCounts {
    network: u32,
    server: u32,
    rate_limit: u32,
}

/// Decides whether and when a failed stream should reconnect.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: BackoffConfig,
    failures: FailureCounts,
    consecutive_retries: u32,
    connected_at: Option<Instant>,
    last_activity: Option<Instant>,
}

impl ReconnectPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: FailureCounts::default(),
            consecutive_retries: 0,
            connected_at: None,
            last_activity: None,
        }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Retries issued since the last reset.
    pub fn consecutive_retries(&self) -> u32 {
        self.consecutive_retries
    }

    /// Note that a connection was established.
    pub fn record_connected(&mut self, now: Instant) {
        self.connected_at = Some(now);
        self.last_activity = None;
    }

    /// Note that the current connection delivered a record or keep-alive.
    ///
    /// Only the span from connect to the last activity counts as streaming,
    /// so a connection that subscribes and then stays silent never resets
    /// the schedule.
    pub fn record_activity(&mut self, now: Instant) {
        if self.connected_at.is_some() {
            self.last_activity = Some(now);
        }
    }

    /// Drop all failure history.
    pub fn reset(&mut self) {
        self.failures = FailureCounts::default();
        self.consecutive_retries = 0;
    }

    /// Classify `error` against the current time.
    pub fn classify(&mut self, error: &TransportError) -> Disposition {
        self.classify_at(error, Instant::now())
    }

    /// Classify `error` as if observed at `now`.
    pub fn classify_at(&mut self, error: &TransportError, now: Instant) -> Disposition {
        let connected_at = self.connected_at.take();
        let last_activity = self.last_activity.take();
        if let (Some(since), Some(until)) = (connected_at, last_activity) {
            let streamed = until.min(now).saturating_duration_since(since);
            if streamed >= Duration::from_secs(self.config.stable_after_secs) {
                debug!(
                    streamed_secs = streamed.as_secs(),
                    "Connection was stable, resetting backoff"
                );
                self.reset();
            }
        }

        let class = error.class();
        if matches!(class, ErrorClass::Auth | ErrorClass::Request) {
            warn!(error = %error, "Non-retryable stream error");
            return Disposition::Fatal(FatalCause::NonRetryable);
        }

        if let Some(max) = self.config.max_retries {
            if self.consecutive_retries >= max {
                warn!(attempts = self.consecutive_retries, "Retry limit reached");
                return Disposition::Fatal(FatalCause::RetriesExhausted {
                    attempts: self.consecutive_retries,
                });
            }
        }
        self.consecutive_retries += 1;

        let delay = match class {
            ErrorClass::Network => {
                self.failures.network += 1;
                compute_backoff(
                    self.failures.network,
                    self.config.network_initial_ms,
                    self.config.network_max_ms,
                )
            }
            ErrorClass::Server => {
                self.failures.server += 1;
                compute_backoff(
                    self.failures.server,
                    self.config.server_initial_ms,
                    self.config.server_max_ms,
                )
            }
            ErrorClass::RateLimit => {
                self.failures.rate_limit += 1;
                let scheduled = compute_backoff(
                    self.failures.rate_limit,
                    self.config.rate_limit_initial_ms,
                    self.config.rate_limit_max_ms,
                );
                error.retry_after().map_or(scheduled, |hint| scheduled.max(hint))
            }
            ErrorClass::Unknown | ErrorClass::Auth | ErrorClass::Request => {
                Duration::from_millis(self.config.network_initial_ms)
            }
        };

        info!(
            class = ?class,
            attempt = self.consecutive_retries,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        Disposition::Retry(delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

/// `initial * 2^(failures - 1)`, capped at `max_ms`. Zero failures means no delay.
fn compute_backoff(failures: u32, initial_ms: u64, max_ms: u64) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let shift = (failures - 1).min(32);
    let multiplier = 1u64 << shift;
    Duration::from_millis(initial_ms.saturating_mul(multiplier).min(max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> TransportError {
        TransportError::Network("connection reset".into())
    }

    fn delays(
        policy: &mut ReconnectPolicy,
        error: &TransportError,
        n: usize,
        now: Instant,
    ) -> Vec<Duration> {
        (0..n)
            .map(|_| match policy.classify_at(error, now) {
                Disposition::Retry(d) => d,
                other => panic!("expected retry, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn compute_backoff_caps_and_grows() {
        assert_eq!(compute_backoff(0, 2_000, 10_000), Duration::ZERO);
        assert_eq!(compute_backoff(1, 2_000, 10_000), Duration::from_secs(2));
        assert_eq!(compute_backoff(2, 2_000, 10_000), Duration::from_secs(4));
        assert_eq!(compute_backoff(3, 2_000, 10_000), Duration::from_secs(8));
        assert_eq!(compute_backoff(4, 2_000, 10_000), Duration::from_secs(10));
        assert_eq!(compute_backoff(200, 2_000, 10_000), Duration::from_secs(10));
    }

    #[test]
    fn auth_and_request_errors_are_fatal() {
        let mut policy = ReconnectPolicy::default();
        let auth = TransportError::from_status(401, "Unauthorized", None);
        let bad = TransportError::from_status(406, "Not Acceptable", None);

        assert_eq!(policy.classify(&auth), Disposition::Fatal(FatalCause::NonRetryable));
        assert_eq!(policy.classify(&bad), Disposition::Fatal(FatalCause::NonRetryable));
        assert_eq!(policy.consecutive_retries(), 0);
    }

    #[test]
    fn network_schedule_doubles_to_cap() {
        let mut policy = ReconnectPolicy::default();
        let now = Instant::now();
        let got = delays(&mut policy, &network(), 8, now);
        let expected: Vec<Duration> = [250, 500, 1_000, 2_000, 4_000, 8_000, 16_000, 16_000]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn rate_limit_starts_at_one_minute() {
        let mut policy = ReconnectPolicy::default();
        let limited = TransportError::from_status(420, "", None);
        let got = delays(&mut policy, &limited, 6, Instant::now());
        assert_eq!(got[0], Duration::from_secs(60));
        assert_eq!(got[1], Duration::from_secs(120));
        assert_eq!(got[4], Duration::from_secs(960));
        assert_eq!(got[5], Duration::from_secs(960));
    }

    #[test]
    fn retry_after_hint_raises_delay() {
        let mut policy = ReconnectPolicy::default();
        let limited = TransportError::from_status(429, "", Some(Duration::from_secs(300)));
        assert_eq!(policy.classify(&limited), Disposition::Retry(Duration::from_secs(300)));
    }

    #[test]
    fn retry_after_hint_never_lowers_delay() {
        let mut policy = ReconnectPolicy::default();
        let limited = TransportError::from_status(429, "", Some(Duration::from_secs(1)));
        assert_eq!(policy.classify(&limited), Disposition::Retry(Duration::from_secs(60)));
    }

    #[test]
    fn server_errors_use_their_own_schedule() {
        let mut policy = ReconnectPolicy::default();
        let now = Instant::now();
        let server = TransportError::from_status(503, "Service Unavailable", None);

        delays(&mut policy, &network(), 3, now);
        let got = delays(&mut policy, &server, 2, now);
        assert_eq!(got, vec![Duration::from_secs(5), Duration::from_secs(10)]);
    }

    #[test]
    fn unknown_errors_retry_at_minimum_delay() {
        let mut policy = ReconnectPolicy::default();
        let unknown = TransportError::Unknown("HTTP 302".into());
        let got = delays(&mut policy, &unknown, 4, Instant::now());
        assert!(got.iter().all(|d| *d == Duration::from_millis(250)));
    }

    #[test]
    fn sustained_streaming_resets_schedule() {
        let mut policy = ReconnectPolicy::default();
        let start = Instant::now();
        delays(&mut policy, &network(), 5, start);

        policy.record_connected(start);
        policy.record_activity(start + Duration::from_secs(60));
        let later = start + Duration::from_secs(61);
        assert_eq!(
            policy.classify_at(&network(), later),
            Disposition::Retry(Duration::from_millis(250))
        );
        assert_eq!(policy.consecutive_retries(), 1);
    }

    #[test]
    fn short_connection_does_not_reset_schedule() {
        let mut policy = ReconnectPolicy::default();
        let start = Instant::now();
        delays(&mut policy, &network(), 2, start);

        policy.record_connected(start);
        let soon = start + Duration::from_secs(5);
        assert_eq!(
            policy.classify_at(&network(), soon),
            Disposition::Retry(Duration::from_millis(1_000))
        );
    }

    #[test]
    fn silent_connection_does_not_reset_schedule() {
        let mut policy = ReconnectPolicy::default();
        let start = Instant::now();
        delays(&mut policy, &network(), 5, start);

        policy.record_connected(start);
        let stalled = TransportError::Stalled(Duration::from_secs(90));
        assert_eq!(
            policy.classify_at(&stalled, start + Duration::from_secs(90)),
            Disposition::Retry(Duration::from_secs(8))
        );
        assert_eq!(policy.consecutive_retries(), 6);
    }

    #[test]
    fn activity_then_silence_counts_only_active_span() {
        let mut policy = ReconnectPolicy::default();
        let start = Instant::now();
        delays(&mut policy, &network(), 3, start);

        // Keep-alives for 10s, then silence until the stall fires.
        policy.record_connected(start);
        policy.record_activity(start + Duration::from_secs(10));
        let stalled = TransportError::Stalled(Duration::from_secs(90));
        assert_eq!(
            policy.classify_at(&stalled, start + Duration::from_secs(100)),
            Disposition::Retry(Duration::from_secs(2))
        );
    }

    #[test]
    fn activity_without_connection_is_ignored() {
        let mut policy = ReconnectPolicy::default();
        let start = Instant::now();
        delays(&mut policy, &network(), 2, start);

        policy.record_activity(start + Duration::from_secs(120));
        assert_eq!(
            policy.classify_at(&network(), start + Duration::from_secs(121)),
            Disposition::Retry(Duration::from_millis(1_000))
        );
    }

    #[test]
    fn unlimited_retries_by_default() {
        let mut policy = ReconnectPolicy::default();
        let got = delays(&mut policy, &network(), 1_000, Instant::now());
        assert_eq!(got.len(), 1_000);
    }

    #[test]
    fn retry_cap_is_enforced() {
        let mut policy = ReconnectPolicy::new(BackoffConfig {
            max_retries: Some(3),
            ..Default::default()
        });
        let now = Instant::now();
        delays(&mut policy, &network(), 3, now);
        assert_eq!(
            policy.classify_at(&network(), now),
            Disposition::Fatal(FatalCause::RetriesExhausted { attempts: 3 })
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: BackoffConfig = serde_json::from_str(r#"{"max_retries": 5}"#).unwrap();
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.network_initial_ms, 250);
        assert_eq!(config.stable_after_secs, 60);
    }
}
