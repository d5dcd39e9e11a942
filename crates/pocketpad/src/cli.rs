//! Command-line interface for the PocketPad relay.
//!
//! Every option overrides the matching setting from the configuration file
//! and the environment.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the relay server.
#[derive(Parser, Debug, Clone)]
#[command(name = "pocketpad", author, version, about = "Relay phone controller input to game hosts", long_about = None)]
pub struct CliArgs {
    /// Configuration file path
    ///
    /// Created with default settings when it does not exist.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Listen address, e.g. "0.0.0.0:3000"
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Listen port, keeping the configured interface
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory the controller UI is served from
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Probe interval in milliseconds
    #[arg(long)]
    pub ping_interval: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from("config.toml"),
            bind: None,
            port: None,
            static_dir: None,
            ping_interval: None,
            log_level: None,
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default() {
        let args = CliArgs::default();
        assert_eq!(args.config, PathBuf::from("config.toml"));
        assert!(args.bind.is_none());
        assert!(args.port.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_parse_overrides() {
        let args = CliArgs::try_parse_from([
            "pocketpad",
            "-c",
            "relay.toml",
            "--port",
            "4000",
            "--ping-interval",
            "500",
            "-l",
            "debug",
            "--json-logs",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("relay.toml"));
        assert_eq!(args.port, Some(4000));
        assert_eq!(args.ping_interval, Some(500));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }

    #[test]
    fn test_parse_rejects_bad_port() {
        assert!(CliArgs::try_parse_from(["pocketpad", "--port", "70000"]).is_err());
    }
}
