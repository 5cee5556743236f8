//! Default listener that writes every event to `tracing`.

use crate::context::ServerContext;
use crate::event::{Event, Listener};

/// Renders events as log lines.
///
/// Lifecycle and votes log at info, rejected input at warn, failed commands
/// and I/O at error, and raw payloads at debug.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl Listener for LoggingListener {
    fn on_event(&self, event: &Event, context: &ServerContext) {
        match event {
            Event::ServerStarting => {
                tracing::info!(
                    "Starting vote listener with {} RCON target(s)",
                    context.rcon_targets().len()
                );
            }
            Event::ServerStarted { local_addr } => {
                tracing::info!("Vote listener started on {}", local_addr);
            }
            Event::ServerStopping => tracing::info!("Vote listener stopping"),
            Event::ServerStopped => tracing::info!("Vote listener stopped"),
            Event::ConnectionEstablished { conn } => {
                tracing::debug!("[{}] Connection established", conn);
            }
            Event::ConnectionEstablishException { error } => {
                tracing::error!("Accept error: {}", error);
            }
            Event::EncryptedInputReceived { conn, input } => {
                tracing::debug!("[{}] Received {} encrypted bytes", conn, input.len());
            }
            Event::DecryptedInputReceived { conn, input } => {
                tracing::debug!("[{}] Decrypted input: {:?}", conn, input);
            }
            Event::DecryptInputException { conn, error } => {
                tracing::warn!("[{}] Could not decrypt input: {}", conn, error);
            }
            Event::InvalidRequest { conn, request } => {
                tracing::warn!("[{}] Invalid request: {:?}", conn, request);
            }
            Event::VoteReceived { conn, vote } => {
                tracing::info!(
                    "[{}] Vote from {} for {} ({}, {})",
                    conn,
                    vote.service_name(),
                    vote.username(),
                    vote.address(),
                    vote.timestamp()
                );
            }
            Event::SendingCommand {
                conn,
                target,
                command,
            } => {
                tracing::info!("[{}] Sending to {}: {}", conn, target, command);
            }
            Event::CommandResponse {
                conn,
                target,
                response,
            } => {
                tracing::info!("[{}] Response from {}: {}", conn, target, response);
            }
            Event::RconException {
                conn,
                target,
                error,
            } => {
                tracing::error!("[{}] RCON error on {}: {}", conn, target, error);
            }
            Event::CommunicationException { conn, error } => {
                tracing::error!("[{}] Communication error: {}", conn, error);
            }
            Event::ConnectionInputStreamCloseException { conn, error } => {
                tracing::error!("[{}] Error closing input stream: {}", conn, error);
            }
            Event::ConnectionClosed { conn } => {
                tracing::debug!("[{}] Connection closed", conn);
            }
            Event::ConnectionCloseException { conn, error } => {
                tracing::error!("[{}] Error closing connection: {}", conn, error);
            }
        }
    }
}
