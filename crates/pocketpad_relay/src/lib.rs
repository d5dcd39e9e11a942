//! # PocketPad Relay
//!
//! Real-time relay between phone controllers and the machines that consume
//! their input. Phones connect over Socket.IO, announce which player they are,
//! and stream button and stick events; every event is broadcast to every
//! connected endpoint (the sender included), where a receiver turns it into
//! virtual gamepad input.
//!
//! ## Architecture Overview
//!
//! * **Player Registry** ([`PlayerRegistry`]) - connection id → player identity
//! * **Hub** ([`Hub`]) - the live subscriber set, one bounded queue per connection
//! * **Channels** ([`ChannelRegistry`]) - optional named grouping of connections
//! * **Relay** ([`Relay`]) - input fan-out, fallback registration, lifecycle
//! * **Prober** ([`Prober`]) - periodic `ping {t}` and per-player latency from `pong`
//! * **Server** ([`RelayServer`]) - axum + socketioxide transport and static UI
//!
//! ### Message Flow
//!
//! 1. Phone emits `controller-input` with `{player, type, button|axis, value}`
//! 2. If the connection never registered, the carried `player` registers it
//! 3. The unmodified object is queued on every live connection
//! 4. Each connection's writer task emits it on its socket
//!
//! Independently, every `ping_interval_ms` the prober broadcasts `ping {t}`;
//! clients echo `pong {t}` and the latency is logged per registered player.
//!
//! ## Wire Protocol
//!
//! | Direction | Event | Payload |
//! |---|---|---|
//! | client→server | `join-room` / `channel-join` | channel name |
//! | client→server | `leave-room` | channel name |
//! | client→server | `register-player` | player identity |
//! | both | `controller-input` | open input object |
//! | server→client | `ping` | `{t}` |
//! | client→server | `pong` | `{t}` |
//!
//! ## Error Handling
//!
//! Only a failed listener bind is fatal ([`RelayError::Bind`]). Malformed
//! payloads are dropped, and a slow or closed peer loses its own frames
//! without affecting anyone else.

pub use channels::ChannelRegistry;
pub use config::RelayConfig;
pub use connection::{ConnectionId, ConnectionState, PlayerRegistry};
pub use error::RelayError;
pub use hub::{BroadcastReport, Hub};
pub use messaging::{events, Frame, InputEvent, InputKind, LatencySample, PlayerIdentity, Probe};
pub use prober::{current_timestamp, Prober};
pub use relay::{InputOutcome, Relay, RelayStatus};
pub use server::RelayServer;
pub use shutdown::ShutdownState;
pub use utils::{create_server, create_server_with_config};

pub mod channels;
pub mod config;
pub mod connection;
pub mod error;
pub mod hub;
pub mod messaging;
pub mod prober;
pub mod relay;
pub mod server;
pub mod shutdown;
pub mod utils;
