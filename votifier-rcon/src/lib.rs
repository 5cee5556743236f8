//! # votifier-rcon
//!
//! Client library for the RCON remote-console protocol.
//!
//! This crate provides:
//! - Little-endian RCON packet framing and a streaming decoder
//! - Async TCP connection with password login
//! - A high-level `Client` for sending console commands

pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod packet;

pub use client::Client;
pub use codec::{Decoder, Encoder};
pub use connection::{Connection, ConnectionConfig};
pub use error::RconError;
pub use packet::{Packet, PacketType, PACKET_HEADER_SIZE};

/// Default RCON port used by Minecraft servers.
pub const DEFAULT_PORT: u16 = 25575;

/// Maximum body size the client will send in one packet.
pub const MAX_REQUEST_BODY_SIZE: usize = 1446;

/// Maximum body size accepted in one response packet.
pub const MAX_RESPONSE_BODY_SIZE: usize = 4096;
