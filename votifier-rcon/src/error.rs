//! RCON client error types.

use thiserror::Error;

/// RCON client errors.
#[derive(Debug, Error)]
pub enum RconError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("authentication failed: wrong RCON password")]
    AuthFailed,

    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge { size: usize, max: usize },

    #[error("invalid packet length: {0}")]
    InvalidLength(i32),

    #[error("packet body must not contain NUL bytes")]
    NulInBody,
}

impl RconError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RconError::Io(_) | RconError::Timeout | RconError::ConnectionClosed
        )
    }
}
