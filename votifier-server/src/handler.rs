//! Per-connection vote pipeline.

use crate::dispatch::{dispatch_vote, CommandSender};
use crate::error::ServerError;
use crate::event::{ConnectionInfo, Event, Notifier};
use std::io;
use std::net::Shutdown;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use votifier_protocol::{Vote, VoteCipher, READ_TIMEOUT, REQUEST_BUFFER_SIZE};

/// Handles a single accepted connection from first byte to close.
pub struct ConnectionHandler {
    conn: ConnectionInfo,
    cipher: Arc<VoteCipher>,
    sender: Arc<dyn CommandSender>,
    notifier: Notifier,
}

impl ConnectionHandler {
    pub fn new(
        conn: ConnectionInfo,
        cipher: Arc<VoteCipher>,
        sender: Arc<dyn CommandSender>,
        notifier: Notifier,
    ) -> Self {
        Self {
            conn,
            cipher,
            sender,
            notifier,
        }
    }

    /// Runs the pipeline and closes the socket. Never fails; every problem
    /// is reported as an event.
    pub async fn run(self, mut stream: TcpStream) {
        let conn = self.conn;
        self.notifier.emit(Event::ConnectionEstablished { conn });

        match self.process(&mut stream).await {
            Ok(()) => {}
            Err(ServerError::Crypto(error)) if error.is_decryption_failure() => {
                self.notifier.emit(Event::DecryptInputException { conn, error });
            }
            Err(error) => {
                self.notifier.emit(Event::CommunicationException { conn, error });
            }
        }

        self.close(stream);
    }

    async fn process(&self, stream: &mut TcpStream) -> Result<(), ServerError> {
        let conn = self.conn;

        // A single read; voting sites send the whole block at once
        let mut buf = [0u8; REQUEST_BUFFER_SIZE];
        let n = tokio::time::timeout(READ_TIMEOUT, stream.read(&mut buf))
            .await
            .map_err(|_| ServerError::ReadTimeout)??;
        let input = buf[..n].to_vec();

        self.notifier.emit(Event::EncryptedInputReceived {
            conn,
            input: String::from_utf8_lossy(&input).into_owned(),
        });

        let cipher = self.cipher.clone();
        let plaintext = tokio::task::spawn_blocking(move || cipher.decrypt(&input)).await??;
        let request = String::from_utf8_lossy(&plaintext).into_owned();

        self.notifier.emit(Event::DecryptedInputReceived {
            conn,
            input: request.clone(),
        });

        match Vote::parse(&request) {
            Ok(vote) => {
                tracing::debug!("[{}] Parsed vote for {}", conn, vote.username());
                self.notifier.emit(Event::VoteReceived {
                    conn,
                    vote: vote.clone(),
                });
                dispatch_vote(
                    &vote,
                    conn,
                    self.notifier.context().rcon_targets(),
                    self.sender.as_ref(),
                    &self.notifier,
                )
                .await;
            }
            Err(e) => {
                tracing::debug!("[{}] Rejected request: {}", conn, e);
                self.notifier
                    .emit(Event::InvalidRequest { conn, request });
            }
        }

        Ok(())
    }

    fn close(&self, stream: TcpStream) {
        let conn = self.conn;

        let stream = match stream.into_std() {
            Ok(stream) => stream,
            Err(error) => {
                self.notifier
                    .emit(Event::ConnectionCloseException { conn, error });
                return;
            }
        };

        // A peer that already reset the connection leaves nothing to shut down
        if let Err(error) = stream.shutdown(Shutdown::Read) {
            if !is_disconnected(&error) {
                self.notifier
                    .emit(Event::ConnectionInputStreamCloseException { conn, error });
            }
        }

        match stream.shutdown(Shutdown::Both) {
            Err(error) if !is_disconnected(&error) => self
                .notifier
                .emit(Event::ConnectionCloseException { conn, error }),
            _ => {
                drop(stream);
                self.notifier.emit(Event::ConnectionClosed { conn });
            }
        }
    }
}

fn is_disconnected(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::NotConnected
}
