//! Error handling for the relay server

use linechat_core::ProtocolError;
use thiserror::Error;

/// Server-side error types.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for server operations.
pub type ServerResult<T> = std::result::Result<T, ServerError>;
