//! votifier - Votifier vote listener
//!
//! Accepts encrypted votes from voting sites and forwards them to game
//! servers as RCON commands.

use tracing_subscriber::EnvFilter;
use votifier_protocol::{KeyPair, DEFAULT_KEY_BITS};
use votifier_server::{Config, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (file from VOTIFIER_CONFIG, then env overrides)
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return Err(e.into());
    }

    let files = &config.key_pair_files;
    let (keys, generated) =
        KeyPair::load_or_generate(&files.public, &files.private, DEFAULT_KEY_BITS)?;
    if generated {
        tracing::info!(
            "Generated new key pair at {} and {}",
            files.public.display(),
            files.private.display()
        );
    }

    tracing::info!("Starting votifier");
    tracing::info!("  Bind address: {}", config.bind_addr());
    tracing::info!("  Public key: {}", files.public.display());
    tracing::info!("  Key fingerprint: {}", keys.fingerprint()?);
    for target in &config.rcon_list {
        tracing::info!(
            "  RCON target: {} ({} command(s))",
            target.address(),
            target.commands.len()
        );
    }

    let bind_addr = config.bind_addr();
    let server = Server::new(config);
    server.start(bind_addr, keys.private().clone()).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, stopping server...");
    server.stop().await?;

    tracing::info!("Server stopped");
    Ok(())
}
