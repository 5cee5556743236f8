//! Read-only view of the running server handed to listeners.

use crate::config::{Config, RconTarget};
use std::sync::Arc;

/// Server context shared with every listener.
#[derive(Debug, Clone)]
pub struct ServerContext {
    config: Arc<Config>,
}

impl ServerContext {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rcon_targets(&self) -> &[RconTarget] {
        &self.config.rcon_list
    }
}
