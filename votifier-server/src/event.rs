//! Event fabric connecting the vote pipeline to its observers.
//!
//! Every stage of the server and of each connection emits an [`Event`].
//! Emission is synchronous: all registered listeners have seen the event
//! before the emitting stage moves on. Listeners cannot alter processing,
//! and a panicking listener is logged and skipped.

use crate::context::ServerContext;
use crate::error::ServerError;
use parking_lot::RwLock;
use std::fmt;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;
use votifier_protocol::{CryptoError, Vote};
use votifier_rcon::RconError;

/// Identity of an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionInfo {
    pub id: Uuid,
    pub peer: SocketAddr,
}

impl ConnectionInfo {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
        }
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.peer, self.id)
    }
}

/// Something that happened in the server or on one of its connections.
#[derive(Debug)]
pub enum Event {
    ServerStarting,
    ServerStarted {
        local_addr: SocketAddr,
    },
    ServerStopping,
    ServerStopped,
    ConnectionEstablished {
        conn: ConnectionInfo,
    },
    /// Accept failed while the server was running.
    ConnectionEstablishException {
        error: std::io::Error,
    },
    /// Raw bytes read from the socket, decoded lossily for display.
    EncryptedInputReceived {
        conn: ConnectionInfo,
        input: String,
    },
    DecryptedInputReceived {
        conn: ConnectionInfo,
        input: String,
    },
    DecryptInputException {
        conn: ConnectionInfo,
        error: CryptoError,
    },
    /// Decrypted payload that is not a vote.
    InvalidRequest {
        conn: ConnectionInfo,
        request: String,
    },
    VoteReceived {
        conn: ConnectionInfo,
        vote: Vote,
    },
    SendingCommand {
        conn: ConnectionInfo,
        target: String,
        command: String,
    },
    CommandResponse {
        conn: ConnectionInfo,
        target: String,
        response: String,
    },
    RconException {
        conn: ConnectionInfo,
        target: String,
        error: RconError,
    },
    CommunicationException {
        conn: ConnectionInfo,
        error: ServerError,
    },
    ConnectionInputStreamCloseException {
        conn: ConnectionInfo,
        error: std::io::Error,
    },
    ConnectionClosed {
        conn: ConnectionInfo,
    },
    ConnectionCloseException {
        conn: ConnectionInfo,
        error: std::io::Error,
    },
}

/// Payload-free discriminant of [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ServerStarting,
    ServerStarted,
    ServerStopping,
    ServerStopped,
    ConnectionEstablished,
    ConnectionEstablishException,
    EncryptedInputReceived,
    DecryptedInputReceived,
    DecryptInputException,
    InvalidRequest,
    VoteReceived,
    SendingCommand,
    CommandResponse,
    RconException,
    CommunicationException,
    ConnectionInputStreamCloseException,
    ConnectionClosed,
    ConnectionCloseException,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ServerStarting => EventKind::ServerStarting,
            Event::ServerStarted { .. } => EventKind::ServerStarted,
            Event::ServerStopping => EventKind::ServerStopping,
            Event::ServerStopped => EventKind::ServerStopped,
            Event::ConnectionEstablished { .. } => EventKind::ConnectionEstablished,
            Event::ConnectionEstablishException { .. } => EventKind::ConnectionEstablishException,
            Event::EncryptedInputReceived { .. } => EventKind::EncryptedInputReceived,
            Event::DecryptedInputReceived { .. } => EventKind::DecryptedInputReceived,
            Event::DecryptInputException { .. } => EventKind::DecryptInputException,
            Event::InvalidRequest { .. } => EventKind::InvalidRequest,
            Event::VoteReceived { .. } => EventKind::VoteReceived,
            Event::SendingCommand { .. } => EventKind::SendingCommand,
            Event::CommandResponse { .. } => EventKind::CommandResponse,
            Event::RconException { .. } => EventKind::RconException,
            Event::CommunicationException { .. } => EventKind::CommunicationException,
            Event::ConnectionInputStreamCloseException { .. } => {
                EventKind::ConnectionInputStreamCloseException
            }
            Event::ConnectionClosed { .. } => EventKind::ConnectionClosed,
            Event::ConnectionCloseException { .. } => EventKind::ConnectionCloseException,
        }
    }

    /// Returns the connection this event belongs to, if any.
    pub fn connection(&self) -> Option<&ConnectionInfo> {
        match self {
            Event::ServerStarting
            | Event::ServerStarted { .. }
            | Event::ServerStopping
            | Event::ServerStopped
            | Event::ConnectionEstablishException { .. } => None,
            Event::ConnectionEstablished { conn }
            | Event::EncryptedInputReceived { conn, .. }
            | Event::DecryptedInputReceived { conn, .. }
            | Event::DecryptInputException { conn, .. }
            | Event::InvalidRequest { conn, .. }
            | Event::VoteReceived { conn, .. }
            | Event::SendingCommand { conn, .. }
            | Event::CommandResponse { conn, .. }
            | Event::RconException { conn, .. }
            | Event::CommunicationException { conn, .. }
            | Event::ConnectionInputStreamCloseException { conn, .. }
            | Event::ConnectionClosed { conn }
            | Event::ConnectionCloseException { conn, .. } => Some(conn),
        }
    }
}

/// Observer of server events.
///
/// Listeners are called concurrently from every connection task and must not
/// block for long.
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &Event, context: &ServerContext);
}

impl<F> Listener for F
where
    F: Fn(&Event, &ServerContext) + Send + Sync,
{
    fn on_event(&self, event: &Event, context: &ServerContext) {
        self(event, context)
    }
}

/// Ordered set of listeners, safe to grow while events are in flight.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn Listener>) {
        self.listeners.write().push(listener);
    }

    /// Returns the current listeners in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn Listener>> {
        self.listeners.read().clone()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Delivers an event to every listener registered at call time.
    pub fn notify(&self, event: &Event, context: &ServerContext) {
        // Listeners registered during delivery see the next event
        for listener in self.snapshot() {
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_event(event, context)));
            if result.is_err() {
                tracing::error!("Listener panicked while handling {:?}", event.kind());
            }
        }
    }
}

/// Emission handle passed down to connection tasks.
#[derive(Clone)]
pub struct Notifier {
    listeners: Arc<ListenerRegistry>,
    context: ServerContext,
}

impl Notifier {
    pub fn new(listeners: Arc<ListenerRegistry>, context: ServerContext) -> Self {
        Self { listeners, context }
    }

    pub fn emit(&self, event: Event) {
        self.listeners.notify(&event, &self.context);
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }
}
