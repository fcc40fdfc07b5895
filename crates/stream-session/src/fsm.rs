//! Session lifecycle state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │ Unauthenticated │ (initial)
//! └────────┬────────┘
//!          │ Start
//!          ▼
//! ┌─────────────────┐  Failed   ┌─────────────────┐
//! │   Connecting    │ ────────► │     Backoff     │
//! └────────┬────────┘ ◄──────── └────────┬────────┘
//!          │ Subscribed   Retry      ▲   │ Abort
//!          ▼                         │   ▼
//! ┌─────────────────┐  Failed        │  ┌─────────────────┐
//! │    Streaming    │ ───────────────┘  │   Terminated    │
//! └────────┬────────┘                   └─────────────────┘
//!          │ Abort (persistence failure)        ▲
//!          └────────────────────────────────────┘
//! ```
//!
//! `Cancel` moves every non-terminal state to `Terminated`.

use rust_fsm::*;

state_machine! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub session_machine(Unauthenticated)

    Unauthenticated => {
        Start => Connecting,
        Cancel => Terminated
    },
    Connecting => {
        Subscribed => Streaming,
        Failed => Backoff,
        Cancel => Terminated
    },
    Streaming => {
        // Error signal, stall, or remote close
        Failed => Backoff,
        // Sink failure
        Abort => Terminated,
        Cancel => Terminated
    },
    Backoff => {
        Retry => Connecting,
        // Non-retryable error or retry cap reached
        Abort => Terminated,
        Cancel => Terminated
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Simplified view of the session state for logs and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Connecting,
    Streaming,
    Backoff,
    Terminated,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Unauthenticated => SessionState::Unauthenticated,
            SessionMachineState::Connecting => SessionState::Connecting,
            SessionMachineState::Streaming => SessionState::Streaming,
            SessionMachineState::Backoff => SessionState::Backoff,
            SessionMachineState::Terminated => SessionState::Terminated,
        }
    }
}
