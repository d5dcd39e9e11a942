//! Error types and handling for the relay.
//!
//! Almost nothing in the relay is fatal: peers that vanish mid-broadcast are
//! skipped and malformed payloads are dropped. The variants here cover the
//! few places where a caller has to react.

use std::net::SocketAddr;

use crate::connection::ConnectionId;

/// Enumeration of possible relay errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The listening socket could not be bound. Startup must abort.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The connection is not live (never connected or already closed)
    #[error("connection {0} is not connected")]
    UnknownConnection(ConnectionId),

    /// The connection's outbound queue is full
    #[error("outbound queue full for connection {0}")]
    QueueFull(ConnectionId),

    /// Invalid relay configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors while serving
    #[error("Network error: {0}")]
    Network(String),
}
