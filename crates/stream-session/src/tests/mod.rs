//! Session tests driven by a scripted transport.
//!
//! - `harness.rs`      - ScriptedTransport and TestHarness
//! - `ordering.rs`     - Records persist verbatim, in arrival order
//! - `reconnect.rs`    - Retryable failures reconnect; stalls are detected
//! - `fatal.rs`        - Auth, request, and retry-cap failures stop the session
//! - `cancellation.rs` - Shutdown in every state
//! - `persistence.rs`  - Sink failures and real files


mod reconnect;
