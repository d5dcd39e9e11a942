//! Configuration management for the PocketPad relay.
//!
//! Settings come from a TOML file, then `POCKETPAD_*` environment variables,
//! then the command line. Later sources win.

use anyhow::{bail, Context, Result};
use pocketpad_relay::config::{
    DEFAULT_OUTBOUND_QUEUE_CAPACITY, DEFAULT_PING_INTERVAL_MS, DEFAULT_PORT,
};
use pocketpad_relay::RelayConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::CliArgs;

pub const ENV_BIND_ADDRESS: &str = "POCKETPAD_BIND_ADDRESS";
pub const ENV_PING_INTERVAL_MS: &str = "POCKETPAD_PING_INTERVAL_MS";
pub const ENV_STATIC_DIR: &str = "POCKETPAD_STATIC_DIR";
pub const ENV_LOG_LEVEL: &str = "POCKETPAD_LOG_LEVEL";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to listen on (e.g. "0.0.0.0:3000")
    pub bind_address: String,
    /// Controller UI directory; empty disables static serving
    pub static_dir: String,
    /// Deliver input only to the sender's channels once it has joined one
    pub channel_scoped_input: bool,
    /// Frames buffered per connection before that peer starts losing them
    pub outbound_queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json_format: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
            static_dir: "public".to_string(),
            channel_scoped_input: false,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_PING_INTERVAL_MS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            probe: ProbeSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration file, writing a default one if it is missing.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
        } else {
            let config = AppConfig::default();
            let content = toml::to_string_pretty(&config)?;
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(config)
        }
    }

    /// Applies `POCKETPAD_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(address) = lookup(ENV_BIND_ADDRESS) {
            self.server.bind_address = address;
        }
        if let Some(interval) = lookup(ENV_PING_INTERVAL_MS) {
            self.probe.interval_ms = interval
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", ENV_PING_INTERVAL_MS))?;
        }
        if let Some(dir) = lookup(ENV_STATIC_DIR) {
            self.server.static_dir = dir;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Applies command-line overrides.
    pub fn apply_cli(&mut self, args: &CliArgs) -> Result<()> {
        if let Some(bind) = &args.bind {
            self.server.bind_address = bind.clone();
        }
        if let Some(port) = args.port {
            let mut address = self.bind_address()?;
            address.set_port(port);
            self.server.bind_address = address.to_string();
        }
        if let Some(dir) = &args.static_dir {
            self.server.static_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(interval) = args.ping_interval {
            self.probe.interval_ms = interval;
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind_address))
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;

        if self.probe.interval_ms == 0 {
            bail!("Probe interval must be greater than zero");
        }
        if self.server.outbound_queue_capacity == 0 {
            bail!("Outbound queue capacity must be greater than zero");
        }
        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                VALID_LEVELS
            );
        }
        Ok(())
    }

    pub fn to_relay_config(&self) -> Result<RelayConfig> {
        let static_dir = match self.server.static_dir.trim() {
            "" => None,
            dir => Some(PathBuf::from(dir)),
        };
        Ok(RelayConfig {
            bind_address: self.bind_address()?,
            ping_interval_ms: self.probe.interval_ms,
            outbound_queue_capacity: self.server.outbound_queue_capacity,
            static_dir,
            channel_scoped_input: self.server.channel_scoped_input,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let relay = config.to_relay_config().unwrap();
        assert_eq!(relay.bind_address, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(relay.ping_interval_ms, 2000);
        assert_eq!(relay.static_dir, Some(PathBuf::from("public")));
        assert!(!relay.channel_scoped_input);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.probe.interval_ms = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[probe]\ninterval_ms = 750\n").await.unwrap();

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.probe.interval_ms, 750);
        assert_eq!(config.server, ServerSettings::default());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[server\nbind_address = ").await.unwrap();

        assert!(AppConfig::load_from_file(&path).await.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_BIND_ADDRESS, "127.0.0.1:4100"),
            (ENV_PING_INTERVAL_MS, "250"),
            (ENV_STATIC_DIR, ""),
            (ENV_LOG_LEVEL, "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        let relay = config.to_relay_config().unwrap();
        assert_eq!(relay.bind_address, "127.0.0.1:4100".parse().unwrap());
        assert_eq!(relay.ping_interval_ms, 250);
        assert_eq!(relay.static_dir, None);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_bad_interval() {
        let mut config = AppConfig::default();
        let result = config.apply_env_with(|key| {
            (key == ENV_PING_INTERVAL_MS).then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_wins_over_env() {
        let mut config = AppConfig::default();
        config
            .apply_env_with(|key| (key == ENV_BIND_ADDRESS).then(|| "10.0.0.5:3000".to_string()))
            .unwrap();

        let args = CliArgs {
            port: Some(8080),
            ping_interval: Some(100),
            json_logs: true,
            ..CliArgs::default()
        };
        config.apply_cli(&args).unwrap();

        assert_eq!(config.server.bind_address, "10.0.0.5:8080");
        assert_eq!(config.probe.interval_ms, 100);
        assert!(config.logging.json_format);
    }
}
