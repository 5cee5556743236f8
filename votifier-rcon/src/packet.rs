//! RCON packet format.
//!
//! Packet layout (all integers little-endian):
//!
//! ```text
//! +--------+------------+--------+----------------+------+
//! | length | request_id |  type  |      body      | pad  |
//! | 4 bytes|  4 bytes   | 4 bytes| length-10 bytes| 0 0  |
//! +--------+------------+--------+----------------+------+
//! ```
//!
//! `length` counts everything after itself: id, type, body and the two
//! trailing NUL bytes.

use crate::error::RconError;
use crate::MAX_RESPONSE_BODY_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the length, request id and type fields (4+4+4 = 12).
pub const PACKET_HEADER_SIZE: usize = 12;

/// Bytes counted by `length` besides the body: id, type and NUL padding.
const LENGTH_OVERHEAD: usize = 10;

/// Request id the server uses to reject a login.
pub const AUTH_FAILURE_ID: i32 = -1;

/// RCON packet type.
///
/// Type 2 means "execute command" from the client and "auth response" from
/// the server, so the constants share a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType(i32);

impl PacketType {
    /// Command output, sent by the server.
    pub const RESPONSE_VALUE: PacketType = PacketType(0);
    /// Console command, sent by the client.
    pub const EXEC_COMMAND: PacketType = PacketType(2);
    /// Login result, sent by the server.
    pub const AUTH_RESPONSE: PacketType = PacketType(2);
    /// Login request, sent by the client.
    pub const AUTH: PacketType = PacketType(3);

    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i32 {
        self.0
    }
}

/// A single RCON packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Client-chosen request id, echoed back by the server.
    pub id: i32,
    pub kind: PacketType,
    pub body: Bytes,
}

impl Packet {
    pub fn new(id: i32, kind: PacketType, body: impl Into<Bytes>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Encodes the packet into bytes.
    pub fn encode(&self) -> Result<BytesMut, RconError> {
        if self.body.contains(&0) {
            return Err(RconError::NulInBody);
        }
        if self.body.len() > crate::MAX_REQUEST_BODY_SIZE {
            return Err(RconError::PacketTooLarge {
                size: self.body.len(),
                max: crate::MAX_REQUEST_BODY_SIZE,
            });
        }

        let length = (self.body.len() + LENGTH_OVERHEAD) as i32;
        let mut buf = BytesMut::with_capacity(4 + length as usize);

        buf.put_i32_le(length);
        buf.put_i32_le(self.id);
        buf.put_i32_le(self.kind.raw());
        buf.put_slice(&self.body);
        buf.put_u8(0);
        buf.put_u8(0);

        Ok(buf)
    }

    /// Decodes a packet from bytes.
    ///
    /// Returns `Ok(Some(packet))` if a complete packet was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on malformed input.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, RconError> {
        if buf.len() < 4 {
            return Ok(None);
        }

        let length = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if length < LENGTH_OVERHEAD as i32 {
            return Err(RconError::InvalidLength(length));
        }
        let length = length as usize;
        if length - LENGTH_OVERHEAD > MAX_RESPONSE_BODY_SIZE {
            return Err(RconError::PacketTooLarge {
                size: length - LENGTH_OVERHEAD,
                max: MAX_RESPONSE_BODY_SIZE,
            });
        }

        if buf.len() < 4 + length {
            return Ok(None);
        }

        buf.advance(4);
        let id = buf.get_i32_le();
        let kind = PacketType::from_raw(buf.get_i32_le());
        let body = buf.split_to(length - LENGTH_OVERHEAD).freeze();
        // Trailing NUL padding
        buf.advance(2);

        Ok(Some(Self { id, kind, body }))
    }
}
