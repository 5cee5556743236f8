//! Encoder and decoder for RCON packets.

use crate::error::RconError;
use crate::packet::{Packet, PacketType};
use bytes::BytesMut;

/// Encodes client requests into packets.
pub struct Encoder;

impl Encoder {
    /// Encodes a login request.
    pub fn encode_auth(id: i32, password: &str) -> Result<BytesMut, RconError> {
        Packet::new(id, PacketType::AUTH, password.to_owned()).encode()
    }

    /// Encodes a console command.
    pub fn encode_command(id: i32, command: &str) -> Result<BytesMut, RconError> {
        Packet::new(id, PacketType::EXEC_COMMAND, command.to_owned()).encode()
    }
}

/// Accumulates bytes from the socket and yields complete packets.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next packet from the buffer.
    pub fn decode_packet(&mut self) -> Result<Option<Packet>, RconError> {
        Packet::decode(&mut self.buffer)
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_decoder_roundtrip() {
        let encoded = Encoder::encode_command(42, "say hello").unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&encoded);

        let decoded = decoder.decode_packet().unwrap().unwrap();
        assert_eq!(decoded.id, 42);
        assert_eq!(decoded.kind, PacketType::EXEC_COMMAND);
        assert_eq!(decoded.body_text(), "say hello");
    }

    #[test]
    fn test_encode_auth() {
        let encoded = Encoder::encode_auth(1, "hunter2").unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&encoded);

        let decoded = decoder.decode_packet().unwrap().unwrap();
        assert_eq!(decoded.kind, PacketType::AUTH);
        assert_eq!(decoded.body_text(), "hunter2");
    }

    #[test]
    fn test_partial_packet_decoding() {
        let encoded = Encoder::encode_command(1, "list").unwrap();

        let mut decoder = Decoder::new();

        // Feed partial data
        decoder.extend(&encoded[..6]);
        assert!(decoder.decode_packet().unwrap().is_none());

        // Feed the rest
        decoder.extend(&encoded[6..]);
        let decoded = decoder.decode_packet().unwrap().unwrap();
        assert_eq!(decoded.id, 1);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_buffered() {
        let mut decoder = Decoder::default();
        assert_eq!(decoder.buffered(), 0);

        decoder.extend(b"some data");
        assert_eq!(decoder.buffered(), 9);

        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
    }
}
