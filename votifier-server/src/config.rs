//! Listener configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. Config file (`VOTIFIER_CONFIG`, default `config.json`; `.yaml`/`.yml`
//!    files are read as YAML). A missing file is created with defaults.
//! 3. Environment variables
//!
//! Files written by older releases (config-version 2) carry a single global
//! command list. They are upgraded in place to the per-target layout before
//! deserialization, and the upgraded file is saved back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Current configuration schema version.
pub const CONFIG_VERSION: u64 = 3;

/// Default config file path when `VOTIFIER_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Command installed on the default RCON target.
pub const DEFAULT_COMMAND: &str = "say ${user-name} just voted on ${service-name}!";

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Schema version.
    pub config_version: u64,
    /// Address to listen on.
    pub ip: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Key-pair file locations.
    pub key_pair_files: KeyPairFiles,
    /// RCON targets, each with its own command templates.
    pub rcon_list: Vec<RconTarget>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: votifier_protocol::DEFAULT_PORT,
            key_pair_files: KeyPairFiles::default(),
            rcon_list: vec![RconTarget {
                commands: vec![DEFAULT_COMMAND.to_string()],
                ..RconTarget::default()
            }],
        }
    }
}

impl Config {
    /// Loads configuration from the file named by `VOTIFIER_CONFIG` (or
    /// `config.json`), then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("VOTIFIER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = Self::load_or_create(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads a config file, writing the defaults there first if it is missing.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, writing defaults", path.display());
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }
        Self::from_file(path)
    }

    /// Loads configuration from a file, upgrading legacy layouts.
    ///
    /// An upgraded file is saved back so the migration only happens once.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;

        let mut value: Value = if is_yaml(path) {
            serde_yaml::from_str(&content)
                .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?
        };

        let migrated = migrate(&mut value)?;
        let config: Config = serde_json::from_value(value)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        if migrated {
            tracing::info!(
                "Upgraded {} to config-version {}",
                path.display(),
                CONFIG_VERSION
            );
            config.save(path)?;
        }

        Ok(config)
    }

    /// Saves configuration, as YAML for `.yaml`/`.yml` paths and JSON otherwise.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)
                .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?
        };
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ip) = lookup("VOTIFIER_IP") {
            if let Ok(parsed) = ip.parse() {
                self.ip = parsed;
            }
        }

        if let Some(port) = lookup("VOTIFIER_PORT") {
            if let Ok(parsed) = port.parse() {
                self.port = parsed;
            }
        }

        if let Some(path) = lookup("VOTIFIER_PUBLIC_KEY") {
            self.key_pair_files.public = PathBuf::from(path);
        }

        if let Some(path) = lookup("VOTIFIER_PRIVATE_KEY") {
            self.key_pair_files.private = PathBuf::from(path);
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ValidationError(
                "port must not be 0".to_string(),
            ));
        }
        if self.rcon_list.is_empty() {
            return Err(ConfigError::ValidationError(
                "rcon-list must contain at least one target".to_string(),
            ));
        }
        for target in &self.rcon_list {
            if target.password.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "RCON target {} has an empty password",
                    target.address()
                )));
            }
        }
        Ok(())
    }

    /// Returns the listening address.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// Key-pair file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPairFiles {
    /// PEM file holding the public key handed to voting sites.
    pub public: PathBuf,
    /// PEM file holding the private key used for decryption.
    pub private: PathBuf,
}

impl Default for KeyPairFiles {
    fn default() -> Self {
        Self {
            public: PathBuf::from("public.pem"),
            private: PathBuf::from("private.pem"),
        }
    }
}

/// A remote console to forward votes to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RconTarget {
    /// Host name or IP address.
    pub ip: String,
    pub port: u16,
    pub password: String,
    /// Command templates, sent in order for every vote.
    pub commands: Vec<String>,
}

impl Default for RconTarget {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: votifier_rcon::DEFAULT_PORT,
            password: "password".to_string(),
            commands: Vec::new(),
        }
    }
}

impl RconTarget {
    pub fn new(ip: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            port,
            password: password.into(),
            commands: Vec::new(),
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Returns `host:port`, bracketing bare IPv6 addresses.
    pub fn address(&self) -> String {
        if self.ip.contains(':') && !self.ip.starts_with('[') {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }
}

impl std::fmt::Debug for RconTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconTarget")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

/// Upgrades a raw config document to the current schema.
///
/// Returns whether anything changed. Documents without a version are taken
/// to be current.
pub fn migrate(value: &mut Value) -> Result<bool, ConfigError> {
    let Some(obj) = value.as_object_mut() else {
        return Err(ConfigError::ValidationError(
            "config root must be an object".to_string(),
        ));
    };

    match obj.get("config-version").and_then(Value::as_u64) {
        None => Ok(false),
        Some(CONFIG_VERSION) => Ok(false),
        Some(2) => {
            migrate_v2_to_v3(obj);
            Ok(true)
        }
        Some(other) => Err(ConfigError::UnsupportedVersion(other)),
    }
}

/// Moves the global `commands` list onto the first RCON target.
///
/// Version 2 files describe their single console either as an `rcon` object
/// or as the first entry of `rcon-list`.
fn migrate_v2_to_v3(obj: &mut Map<String, Value>) {
    let commands = obj
        .remove("commands")
        .unwrap_or_else(|| Value::Array(Vec::new()));

    let mut targets = match obj.remove("rcon-list") {
        Some(Value::Array(targets)) => targets,
        _ => Vec::new(),
    };
    if let Some(rcon @ Value::Object(_)) = obj.remove("rcon") {
        targets.insert(0, rcon);
    }
    if targets.is_empty() {
        targets.push(Value::Object(Map::new()));
    }
    if let Some(Value::Object(first)) = targets.first_mut() {
        first.insert("commands".to_string(), commands);
    }

    obj.insert("rcon-list".to_string(), Value::Array(targets));
    obj.insert("config-version".to_string(), Value::from(CONFIG_VERSION));
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
    UnsupportedVersion(u64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to access config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
            ConfigError::UnsupportedVersion(v) => {
                write!(f, "unsupported config-version {}", v)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
