//! Convenience constructors.

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::server::RelayServer;

/// Creates a relay server with default configuration.
pub fn create_server() -> Result<RelayServer, RelayError> {
    create_server_with_config(RelayConfig::default())
}

/// Creates a relay server with the given configuration.
pub fn create_server_with_config(config: RelayConfig) -> Result<RelayServer, RelayError> {
    RelayServer::new(config)
}
