//! Core types for the linechat relay
//!
//! Newtype and enum definitions shared by the server and client crates.

use core::fmt;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Session Identifier
// ----------------------------------------------------------------------------

/// Opaque handle for one accepted connection.
///
/// Identifies a session for equality and registry lookup only; the value
/// carries no meaning beyond process-unique assignment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Routing Mode
// ----------------------------------------------------------------------------

/// Selects where a session's chat lines are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageMode {
    /// Deliver to every other active session.
    Broadcast,
    /// Deliver to the session's chosen private recipient.
    Private,
}

impl Default for MessageMode {
    fn default() -> Self {
        MessageMode::Broadcast
    }
}

// ----------------------------------------------------------------------------
// Session Role
// ----------------------------------------------------------------------------

/// Liveness role of a session. At most one session holds `Coordinator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionRole {
    Member,
    Coordinator,
}

// ----------------------------------------------------------------------------
// Session Lifecycle State
// ----------------------------------------------------------------------------

/// Lifecycle state of one session worker.
///
/// `Connecting → Registering → AwaitingReady → Active → Closing → Closed`,
/// with `Registering` looping on name conflicts. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Connection accepted, worker not yet started.
    Connecting,
    /// Awaiting a unique display-name proposal.
    Registering,
    /// Name accepted, awaiting the readiness acknowledgment.
    AwaitingReady,
    /// Normal command and message processing.
    Active,
    /// Registry removal and resource release in progress.
    Closing,
    /// Terminal.
    Closed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_equality_and_display() {
        let a = SessionId::new(7);
        let b = SessionId::new(7);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "session-7");
        assert_ne!(a, SessionId::new(8));
    }

    #[test]
    fn default_mode_is_broadcast() {
        assert_eq!(MessageMode::default(), MessageMode::Broadcast);
    }

    #[test]
    fn only_closed_is_terminal() {
        assert!(SessionState::Closed.is_terminal());
        assert!(!SessionState::Closing.is_terminal());
        assert!(!SessionState::Active.is_terminal());
    }
}
