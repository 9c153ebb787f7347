//! Error types shared across the linechat crates
//!
//! Protocol-level failures are fatal to the one connection that produced
//! them and never propagate to other sessions; recoverable conditions
//! (name conflicts, missing private recipients) are inline protocol
//! replies, not errors.

use thiserror::Error;

/// Failures in the per-connection protocol exchange.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer closed the connection (or its reader task ended) while a
    /// line was still expected.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Out-of-order handshake input. The readiness step accepts exactly one
    /// token; anything else ends the session.
    #[error("handshake violation: expected {expected}, got {got:?}")]
    HandshakeViolation { expected: &'static str, got: String },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_violation_names_the_offender() {
        let err = ProtocolError::HandshakeViolation {
            expected: "READY",
            got: "!online".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("READY"));
        assert!(rendered.contains("!online"));
    }
}
