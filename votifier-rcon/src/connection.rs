//! Connection management.

use crate::codec::{Decoder, Encoder};
use crate::error::RconError;
use crate::packet::{Packet, PacketType, AUTH_FAILURE_ID};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default read buffer size (4 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024;

/// Connection configuration.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Server address as `host:port`.
    pub addr: String,
    /// RCON password.
    pub password: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout, covering login and each command.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("addr", &self.addr)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("read_buffer_size", &self.read_buffer_size)
            .finish_non_exhaustive()
    }
}

impl ConnectionConfig {
    pub fn new(addr: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            password: password.into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

struct Inner {
    stream: Option<TcpStream>,
    decoder: Decoder,
}

/// A connection to an RCON server.
///
/// Commands are serialized: each one holds the stream until its response
/// arrives.
pub struct Connection {
    config: ConnectionConfig,
    inner: Mutex<Inner>,
    /// Next request ID. Starts at 1 so it never collides with the auth
    /// failure marker.
    next_id: AtomicI32,
    /// Is the connection established and logged in?
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                stream: None,
                decoder: Decoder::new(),
            }),
            next_id: AtomicI32::new(1),
            connected: AtomicBool::new(false),
        }
    }

    /// Connects to the server and logs in.
    pub async fn connect(&self) -> Result<(), RconError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let tcp_stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr.as_str()),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            RconError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            RconError::Io(e)
        })?;

        tcp_stream.set_nodelay(true).ok();

        {
            let mut inner = self.inner.lock().await;
            inner.stream = Some(tcp_stream);
            inner.decoder.clear();
        }

        tracing::debug!("TCP connected, logging in...");
        self.login().await?;
        tracing::debug!("Login successful");

        // Mark as connected only after successful login
        self.connected.store(true, Ordering::SeqCst);

        Ok(())
    }

    /// Sends the password and waits for the auth response.
    async fn login(&self) -> Result<(), RconError> {
        let id = self.next_id();
        let encoded = Encoder::encode_auth(id, &self.config.password)?;

        let mut inner = self.inner.lock().await;
        tokio::time::timeout(self.config.request_timeout, async {
            Self::write(&mut inner, &encoded).await?;

            loop {
                let packet = Self::read_packet(&mut inner, self.config.read_buffer_size).await?;

                // Some servers send an empty RESPONSE_VALUE ahead of the auth response
                if packet.kind != PacketType::AUTH_RESPONSE {
                    tracing::debug!("Skipping packet type {} during login", packet.kind.raw());
                    continue;
                }
                if packet.id == AUTH_FAILURE_ID {
                    return Err(RconError::AuthFailed);
                }
                if packet.id == id {
                    return Ok(());
                }
                tracing::debug!("Ignoring auth response for id={}", packet.id);
            }
        })
        .await
        .map_err(|_| {
            tracing::debug!("Login timeout");
            RconError::Timeout
        })?
    }

    /// Sends a console command and returns the server's response text.
    pub async fn command(&self, command: &str) -> Result<String, RconError> {
        if !self.connected.load(Ordering::SeqCst) {
            tracing::debug!("command() called but not connected");
            return Err(RconError::NotConnected);
        }

        let id = self.next_id();
        let encoded = Encoder::encode_command(id, command)?;
        tracing::debug!("Sending command id={} ({} bytes)", id, encoded.len());

        let mut inner = self.inner.lock().await;
        let result = match tokio::time::timeout(self.config.request_timeout, async {
            Self::write(&mut inner, &encoded).await?;

            loop {
                let packet = Self::read_packet(&mut inner, self.config.read_buffer_size).await?;
                if packet.id == id {
                    return Ok(packet.body_text());
                }
                tracing::debug!("Ignoring packet for id={}", packet.id);
            }
        })
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!("Command id={} timed out", id);
                Err(RconError::Timeout)
            }
        };

        if let Err(ref e) = result {
            if !e.is_retryable() {
                return result;
            }
            // Transport failures leave the stream in an unknown state
            self.connected.store(false, Ordering::SeqCst);
            inner.stream = None;
        }
        result
    }

    async fn write(inner: &mut Inner, bytes: &[u8]) -> Result<(), RconError> {
        let stream = inner.stream.as_mut().ok_or(RconError::NotConnected)?;
        stream.write_all(bytes).await.map_err(RconError::Io)
    }

    async fn read_packet(inner: &mut Inner, buffer_size: usize) -> Result<Packet, RconError> {
        let mut buf = vec![0u8; buffer_size];

        loop {
            if let Some(packet) = inner.decoder.decode_packet()? {
                tracing::debug!("Decoded packet id={}", packet.id);
                return Ok(packet);
            }

            let stream = inner.stream.as_mut().ok_or(RconError::NotConnected)?;
            let n = stream.read(&mut buf).await.map_err(RconError::Io)?;
            if n == 0 {
                tracing::debug!("Connection closed (0 bytes)");
                return Err(RconError::ConnectionClosed);
            }
            inner.decoder.extend(&buf[..n]);
        }
    }

    fn next_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns the server address.
    pub fn addr(&self) -> &str {
        &self.config.addr
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), RconError> {
        tracing::debug!("Closing connection to {}", self.config.addr);

        // Mark as disconnected first to stop any new commands
        self.connected.store(false, Ordering::SeqCst);

        let mut inner = self.inner.lock().await;
        if let Some(mut stream) = inner.stream.take() {
            let _ = stream.shutdown().await;
        }
        inner.decoder.clear();
        Ok(())
    }
}
