//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::RconError;
use std::sync::Arc;

/// High-level RCON client.
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
        }
    }

    /// Connects to the server and logs in.
    pub async fn connect(&self) -> Result<(), RconError> {
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), RconError> {
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    /// Runs a console command and returns its output.
    pub async fn command(&self, command: &str) -> Result<String, RconError> {
        self.conn.command(command).await
    }

    /// Connects, runs one command and disconnects.
    ///
    /// The connection is closed whether or not the command succeeds.
    pub async fn execute_once(config: ConnectionConfig, command: &str) -> Result<String, RconError> {
        let client = Self::new(config);
        client.connect().await?;
        let result = client.command(command).await;
        if let Err(e) = client.close().await {
            tracing::debug!("Error closing RCON connection: {}", e);
        }
        result
    }
}
