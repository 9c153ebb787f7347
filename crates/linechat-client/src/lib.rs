//! Interactive terminal client for the linechat relay
//!
//! Connects to a relay, drives the registration/readiness handshake, then
//! splits into a printer task for inbound traffic and a console loop for
//! outbound lines. When the relay promotes this session to coordinator,
//! the client starts the heartbeat timer that opens liveness rounds.

pub mod cli;
pub mod client;
pub mod error;
pub mod heartbeat;
pub mod printer;

pub use cli::Args;
pub use client::run;
pub use error::{ClientError, ClientResult};
