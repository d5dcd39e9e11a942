//! Socket.IO transport for the relay.
//!
//! * `core` - [`RelayServer`]: router, listener, prober task
//! * `handlers` - per-socket event wiring onto [`Relay`](crate::Relay)
//! * `routes` - health and status endpoints

pub mod core;
pub mod handlers;
pub mod routes;

pub use self::core::RelayServer;
