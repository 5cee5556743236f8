//! # votifier-protocol
//!
//! Wire protocol implementation for the Votifier vote protocol.
//!
//! This crate provides:
//! - The `Vote` record and the newline-separated vote payload format
//! - RSA (PKCS#1 v1.5) encryption and decryption of vote requests
//! - Key-pair storage as PEM files
//! - Error types and protocol constants

pub mod crypto;
pub mod error;
pub mod vote;

pub use crypto::{KeyPair, VoteCipher, VoteEncryptor};
pub use error::{CryptoError, ProtocolError};
pub use vote::{Vote, VOTE_OPCODE};

pub use rsa::{RsaPrivateKey, RsaPublicKey};

use std::time::Duration;

/// Maximum size of a single vote request (one RSA-2048 block).
pub const REQUEST_BUFFER_SIZE: usize = 256;

/// How long a connection may stay silent before its request is abandoned.
pub const READ_TIMEOUT: Duration = Duration::from_millis(4102);

/// Default Votifier listening port.
pub const DEFAULT_PORT: u16 = 8192;

/// Default RSA modulus size for generated key pairs.
pub const DEFAULT_KEY_BITS: usize = 2048;
