//! # votifier-server
//!
//! Votifier vote listener.
//!
//! This crate provides:
//! - The TCP accept loop and start/stop lifecycle
//! - A per-connection decrypt, parse and dispatch pipeline
//! - An event fabric with pluggable listeners
//! - `${key}` command templating and RCON dispatch with per-command isolation
//! - Configuration loading with legacy schema migration

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod logging;
pub mod server;
pub mod template;

pub use config::{Config, ConfigError, KeyPairFiles, RconTarget};
pub use context::ServerContext;
pub use dispatch::{dispatch_vote, CommandSender, RconCommandSender};
pub use error::ServerError;
pub use event::{ConnectionInfo, Event, EventKind, Listener, ListenerRegistry, Notifier};
pub use handler::ConnectionHandler;
pub use logging::LoggingListener;
pub use server::Server;
pub use template::Substitutions;
