//! Retryable failures reconnect without losing or duplicating records.

use super::harness::{fast_backoff, record, Connection, TestHarness};
use crate::{InboundUnit, SessionConfig};
use capture_sink::MemorySink;
use reconnect_policy::TransportError;
use std::time::Duration;

#[tokio::test]
async fn remote_close_then_reconnect_continues_capture() {
    let harness = TestHarness::start([
        Connection::Stream(vec![record("A")]),
        Connection::StreamThenHang(vec![record("B")]),
    ]);

    harness.wait_until("both records", |h| h.sink.contents() == b"AB").await;
    let report = harness.stop().await.unwrap();

    assert_eq!(report.connections, 2);
    assert_eq!(report.reconnects, 1);
    assert_eq!(report.records, 2);
}

#[tokio::test]
async fn rate_limit_between_connections() {
    let harness = TestHarness::start([
        Connection::Stream(vec![record("A")]),
        Connection::Reject(TransportError::from_status(420, "Enhance Your Calm", None)),
        Connection::StreamThenHang(vec![record("B")]),
    ]);

    harness.wait_until("both records", |h| h.sink.contents() == b"AB").await;
    let calls = harness.transport.calls();
    let report = harness.stop().await.unwrap();

    assert_eq!(calls.len(), 3);
    assert_eq!(report.connect_attempts, 3);
    assert_eq!(report.connections, 2);
    assert_eq!(report.reconnects, 2);
    // Rate-limit schedule starts at 5ms in the fast config.
    assert!(calls[2].at.duration_since(calls[1].at) >= Duration::from_millis(5));
}

#[tokio::test]
async fn rate_limit_signal_mid_stream_backs_off_then_resumes() {
    let harness = TestHarness::start([
        Connection::Stream(vec![
            record("A"),
            InboundUnit::Signal(TransportError::RateLimited {
                status: 420,
                retry_after: None,
            }),
            record("dropped"),
        ]),
        Connection::StreamThenHang(vec![record("B")]),
    ]);

    harness.wait_until("both records", |h| h.sink.contents() == b"AB").await;
    let calls = harness.transport.calls();
    let report = harness.stop().await.unwrap();

    assert_eq!(report.records, 2);
    assert_eq!(report.connections, 2);
    assert_eq!(report.reconnects, 1);
    assert!(calls[1].at.duration_since(calls[0].at) >= Duration::from_millis(5));
}

#[tokio::test]
async fn unanswered_subscribe_is_abandoned_and_retried() {
    let config = SessionConfig {
        connect_timeout: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let harness = TestHarness::start_with(
        [
            Connection::Hang,
            Connection::StreamThenHang(vec![record("A")]),
        ],
        MemorySink::new(),
        fast_backoff(),
        config,
    );

    harness.wait_until("record after retry", |h| h.sink.contents() == b"A").await;
    let calls = harness.transport.calls();
    let report = harness.stop().await.unwrap();

    assert_eq!(calls.len(), 2);
    assert!(calls[1].at.duration_since(calls[0].at) >= Duration::from_millis(50));
    assert_eq!(report.connect_attempts, 2);
    assert_eq!(report.connections, 1);
    assert_eq!(report.reconnects, 1);
}

#[tokio::test]
async fn mid_stream_error_signal_reconnects() {
    let harness = TestHarness::start([
        Connection::Stream(vec![
            record("A"),
            InboundUnit::Signal(TransportError::Network("connection reset".into())),
            record("never"),
        ]),
        Connection::StreamThenHang(vec![record("B")]),
    ]);

    harness.wait_until("both records", |h| h.sink.contents() == b"AB").await;
    assert_eq!(harness.contents(), "AB");
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn server_errors_and_network_failures_are_retried() {
    let harness = TestHarness::start([
        Connection::Reject(TransportError::from_status(503, "Service Unavailable", None)),
        Connection::Reject(TransportError::Network("dns failure".into())),
        Connection::Reject(TransportError::from_status(500, "Internal Server Error", None)),
        Connection::StreamThenHang(vec![record("A")]),
    ]);

    harness.wait_until("record", |h| h.sink.contents() == b"A").await;
    let report = harness.stop().await.unwrap();
    assert_eq!(report.connect_attempts, 4);
    assert_eq!(report.connections, 1);
}

#[tokio::test]
async fn stall_is_detected_and_reconnected() {
    let config = SessionConfig {
        stall_timeout: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let harness = TestHarness::start_with(
        [
            Connection::StreamThenHang(vec![record("A")]),
            Connection::StreamThenHang(vec![record("B")]),
        ],
        MemorySink::new(),
        fast_backoff(),
        config,
    );

    harness.wait_until("both records", |h| h.sink.contents() == b"AB").await;
    let calls = harness.transport.calls();
    harness.stop().await.unwrap();

    assert!(calls[1].at.duration_since(calls[0].at) >= Duration::from_millis(50));
}

#[tokio::test]
async fn silence_shorter_than_stall_timeout_keeps_connection() {
    let config = SessionConfig {
        stall_timeout: Duration::from_millis(200),
        ..SessionConfig::default()
    };
    let harness = TestHarness::start_with(
        [Connection::StreamThenHang(vec![InboundUnit::KeepAlive; 3])],
        MemorySink::new(),
        fast_backoff(),
        config,
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.transport.call_count(), 1);
    harness.stop().await.unwrap();
}
