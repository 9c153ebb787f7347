//! Error handling for the linechat client

use thiserror::Error;

/// Client-side error types.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("console input closed")]
    InputClosed,

    #[error("unexpected registration reply: {0:?}")]
    UnexpectedReply(String),
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
