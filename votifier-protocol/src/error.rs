//! Protocol and cipher error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing or building vote payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid opcode: expected 'VOTE', got {0:?}")]
    InvalidOpcode(String),

    #[error("invalid field count: {0} (expected 5 or 6)")]
    FieldCount(usize),

    #[error("field {0} must not contain a newline")]
    NewlineInField(&'static str),

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Errors raised by the RSA capability and key storage.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Padding or format mismatch: wrong key or corrupted ciphertext.
    #[error("decryption failed: bad padding or wrong key")]
    Decryption,

    #[error("cipher error: {0}")]
    Cipher(String),

    #[error("invalid payload: {0}")]
    Payload(#[from] ProtocolError),

    #[error("key file not found: {0}")]
    KeyFileNotFound(PathBuf),

    #[error("invalid key file '{path}': {reason}")]
    InvalidKeyFile { path: PathBuf, reason: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CryptoError {
    /// Returns whether this is a padding/format failure rather than an
    /// operational one.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, CryptoError::Decryption)
    }
}

impl From<rsa::Error> for CryptoError {
    fn from(err: rsa::Error) -> Self {
        match err {
            rsa::Error::Decryption => CryptoError::Decryption,
            other => CryptoError::Cipher(other.to_string()),
        }
    }
}
