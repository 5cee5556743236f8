//! votifier-cli - Command-line tools for the Votifier listener
//!
//! Generates key pairs, sends test votes, upgrades config files and talks to
//! RCON consoles either one-shot or through a REPL.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "votifier-cli")]
#[command(about = "Command-line tools for the Votifier vote listener")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new RSA key pair
    GenKeys {
        /// Public key output path
        #[arg(long, default_value = "public.pem")]
        public: PathBuf,

        /// Private key output path
        #[arg(long, default_value = "private.pem")]
        private: PathBuf,

        /// Key size in bits
        #[arg(short, long, default_value_t = votifier_protocol::DEFAULT_KEY_BITS)]
        bits: usize,

        /// Overwrite existing key files
        #[arg(short, long)]
        force: bool,
    },

    /// Print the SHA-256 fingerprint of a public key
    Fingerprint {
        /// Public key path
        #[arg(default_value = "public.pem")]
        public: PathBuf,
    },

    /// Encrypt and send a vote to a listener
    TestVote {
        /// Listener address
        #[arg(short, long, default_value = "127.0.0.1:8192", env = "VOTIFIER_ADDR")]
        server: String,

        /// Listener public key
        #[arg(short = 'k', long, default_value = "public.pem")]
        public_key: PathBuf,

        /// Voting player name
        #[arg(short, long)]
        username: String,

        /// Service name reported to the listener
        #[arg(long, default_value = "votifier-cli")]
        service: String,

        /// Voter address
        #[arg(short, long, default_value = "127.0.0.1")]
        address: String,

        /// Vote timestamp (defaults to now, in milliseconds)
        #[arg(short, long)]
        timestamp: Option<String>,
    },

    /// Upgrade a config file to the current schema in place
    MigrateConfig {
        /// Config file path
        #[arg(default_value = "config.json")]
        path: PathBuf,
    },

    /// Run an RCON command, or open a console when no command is given
    Rcon {
        /// RCON address
        #[arg(short, long, default_value = "127.0.0.1:25575")]
        server: String,

        /// RCON password
        #[arg(short, long, env = "VOTIFIER_RCON_PASSWORD")]
        password: String,

        /// Command to run
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rcon {
            server,
            password,
            command,
        } if command.is_empty() => {
            repl::run(server, password).await?;
        }
        cmd => match commands::execute(cmd).await {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
