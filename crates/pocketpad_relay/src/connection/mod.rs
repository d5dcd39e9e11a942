//! Connection identity, lifecycle and the player registry.
//!
//! Connections are owned by the transport layer. Everything in here refers to
//! them only through a [`ConnectionId`].

pub mod client;
pub mod registry;

pub use client::ClientConnection;
pub use registry::PlayerRegistry;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque identifier assigned by the transport when a connection is accepted.
///
/// For Socket.IO connections this is the socket id. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Lifecycle of a single connection.
///
/// `Connected -> Registered -> Disconnected`. `Disconnected` is terminal; a
/// reconnecting client gets a new [`ConnectionId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted by the transport, no player identity yet
    Connected,
    /// Has a player identity (explicit or fallback registration)
    Registered,
    /// Closed, or never known to the relay
    Disconnected,
}
