//! Core protocol implementation for the linechat relay
//!
//! This crate holds everything shared by the relay server and the client:
//! the newline-delimited wire protocol (token constants, request parsing,
//! chat-line formatting), the core session types, the error taxonomy, the
//! timing configuration, and the clock/randomness abstractions that keep
//! election and timestamp logic deterministic under test.

pub mod clock;
pub mod config;
pub mod error;
pub mod protocol;
pub mod random;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ServerConfig, TimingConfig};
pub use error::{ProtocolError, ProtocolResult};
pub use protocol::{ChatCommand, ClientRequest};
pub use random::{RandomSource, SeededRandom, SystemRandom};
pub use types::{MessageMode, SessionId, SessionRole, SessionState};
