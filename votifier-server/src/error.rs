//! Server error types.

use crate::config::ConfigError;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] votifier_protocol::ProtocolError),

    #[error("crypto error: {0}")]
    Crypto(#[from] votifier_protocol::CryptoError),

    #[error("RCON error: {0}")]
    Rcon(#[from] votifier_rcon::RconError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("server is already running")]
    AlreadyRunning,

    #[error("server is not running")]
    NotRunning,

    #[error("timed out waiting for vote payload")]
    ReadTimeout,

    #[error("task failed: {0}")]
    Task(String),
}

impl ServerError {
    /// Returns whether the error came from an undecryptable payload.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, ServerError::Crypto(e) if e.is_decryption_failure())
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Task(err.to_string())
    }
}
