//! Command execution.

use crate::Commands;
use colored::Colorize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use votifier_protocol::crypto::{load_public_key, public_key_fingerprint};
use votifier_protocol::{KeyPair, Vote, VoteEncryptor, REQUEST_BUFFER_SIZE};
use votifier_rcon::{Client, ConnectionConfig};
use votifier_server::Config;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes a command and returns the formatted output.
pub async fn execute(cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::GenKeys {
            public,
            private,
            bits,
            force,
        } => {
            // The listener reads a single block of this size
            let max_bits = REQUEST_BUFFER_SIZE * 8;
            if bits > max_bits {
                return Err(format!(
                    "{}-bit keys are not supported; the listener accepts at most {} bits",
                    bits, max_bits
                )
                .into());
            }
            if !force && (public.exists() || private.exists()) {
                return Err(format!(
                    "{} or {} already exists (use --force to overwrite)",
                    public.display(),
                    private.display()
                )
                .into());
            }
            let keys = KeyPair::generate(bits)?;
            keys.save(&public, &private)?;
            Ok(format!(
                "{} {}-bit key pair\n  public:  {}\n  private: {}\n  fingerprint: {}",
                "Generated".green(),
                bits,
                public.display().to_string().cyan(),
                private.display().to_string().cyan(),
                keys.fingerprint()?
            ))
        }

        Commands::Fingerprint { public } => {
            let key = load_public_key(&public)?;
            Ok(public_key_fingerprint(&key)?)
        }

        Commands::TestVote {
            server,
            public_key,
            username,
            service,
            address,
            timestamp,
        } => {
            let timestamp = timestamp.unwrap_or_else(now_millis);
            let vote = Vote::new(service, username, address, timestamp);
            let block = encrypt_vote(&public_key, &vote)?;
            send_block(&server, &block).await?;
            Ok(format!(
                "{} vote for {} to {} ({} bytes)",
                "Sent".green(),
                vote.username().cyan(),
                server,
                block.len()
            ))
        }

        Commands::MigrateConfig { path } => {
            if !path.exists() {
                return Err(format!("{} not found", path.display()).into());
            }
            // Loading upgrades legacy files and writes them back
            let config = Config::from_file(&path)?;
            config.validate()?;
            Ok(format!(
                "{} {} (config-version {}, {} RCON target(s))",
                "Migrated".green(),
                path.display().to_string().cyan(),
                config.config_version,
                config.rcon_list.len()
            ))
        }

        Commands::Rcon {
            server,
            password,
            command,
        } => {
            let config = ConnectionConfig::new(server, password);
            let response = Client::execute_once(config, &command.join(" ")).await?;
            if response.is_empty() {
                Ok("(no output)".dimmed().to_string())
            } else {
                Ok(response)
            }
        }
    }
}

fn encrypt_vote(public_key: &Path, vote: &Vote) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let key = load_public_key(public_key)?;
    Ok(VoteEncryptor::new(key).encrypt_vote(vote)?)
}

async fn send_block(server: &str, block: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = tokio::time::timeout(SEND_TIMEOUT, TcpStream::connect(server))
        .await
        .map_err(|_| format!("timed out connecting to {}", server))??;
    stream.write_all(block).await?;
    stream.shutdown().await?;
    Ok(())
}

fn now_millis() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}
