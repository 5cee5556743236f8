//! Vote record and the plaintext request format.
//!
//! A decrypted request is UTF-8 text with newline-separated fields:
//!
//! ```text
//! VOTE\n<service>\n<user>\n<address>\n<timestamp>[\n<extra>]
//! ```
//!
//! Trailing empty fields are ignored when counting, so a payload ending in a
//! newline still has five fields.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// Opcode that must open every vote request.
pub const VOTE_OPCODE: &str = "VOTE";

/// A single vote, as announced by a voting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vote {
    service_name: String,
    username: String,
    address: String,
    timestamp: String,
}

impl Vote {
    pub fn new(
        service_name: impl Into<String>,
        username: impl Into<String>,
        address: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            username: username.into(),
            address: address.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Parses a decrypted request.
    ///
    /// Accepts exactly 5 or 6 fields with `VOTE` first. A sixth field is
    /// tolerated but not kept.
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        let fields = split_fields(payload);

        if fields.len() != 5 && fields.len() != 6 {
            return Err(ProtocolError::FieldCount(fields.len()));
        }
        if fields[0] != VOTE_OPCODE {
            return Err(ProtocolError::InvalidOpcode(fields[0].to_string()));
        }

        Ok(Self::new(fields[1], fields[2], fields[3], fields[4]))
    }

    /// Encodes this vote as a plaintext request.
    pub fn to_payload(&self) -> Result<String, ProtocolError> {
        for (name, value) in [
            ("service_name", &self.service_name),
            ("username", &self.username),
            ("address", &self.address),
            ("timestamp", &self.timestamp),
        ] {
            if value.contains('\n') {
                return Err(ProtocolError::NewlineInField(name));
            }
        }

        Ok(format!(
            "{}\n{}\n{}\n{}\n{}\n",
            VOTE_OPCODE, self.service_name, self.username, self.address, self.timestamp
        ))
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Splits a payload on `\n`, dropping trailing empty fields.
fn split_fields(payload: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = payload.split('\n').collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}
