//! Relay configuration.
//!
//! [`RelayConfig`] is the library-level configuration consumed by
//! [`RelayServer`](crate::RelayServer). Binaries translate their own file/CLI
//! formats into this structure.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::RelayError;

/// Default listening port, shared with the phone UI and consumers.
pub const DEFAULT_PORT: u16 = 3000;

/// Default interval between liveness probes.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 2000;

/// Default per-connection outbound queue depth.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Configuration for the relay server.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP/Socket.IO listener binds to
    pub bind_address: SocketAddr,

    /// Milliseconds between `ping` probe broadcasts
    pub ping_interval_ms: u64,

    /// Frames buffered per connection before that connection starts dropping
    pub outbound_queue_capacity: usize,

    /// Directory served as the controller UI, if any
    pub static_dir: Option<PathBuf>,

    /// Scope `controller-input` to the sender's channels once it has joined one
    pub channel_scoped_input: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            static_dir: Some(PathBuf::from("public")),
            channel_scoped_input: false,
        }
    }
}

impl RelayConfig {
    /// Probe interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Checks values that would make the relay misbehave at runtime.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.ping_interval_ms == 0 {
            return Err(RelayError::Config(
                "ping interval must be greater than zero".to_string(),
            ));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(RelayError::Config(
                "outbound queue capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_address.port(), 3000);
        assert!(config.bind_address.ip().is_unspecified());
        assert_eq!(config.ping_interval(), Duration::from_millis(2000));
        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.static_dir, Some(PathBuf::from("public")));
        assert!(!config.channel_scoped_input);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = RelayConfig {
            ping_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = RelayConfig {
            outbound_queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));
    }
}
