//! Wire protocol: event names, payload types and outbound frames.

pub mod types;

pub use types::{InputEvent, InputKind, LatencySample, MalformedInput, PlayerIdentity, Probe};

use serde_json::Value;
use std::sync::Arc;

/// Socket.IO event names used on the wire.
pub mod events {
    /// client→server: join a named channel
    pub const JOIN_ROOM: &str = "join-room";
    /// client→server: alias of [`JOIN_ROOM`]
    pub const CHANNEL_JOIN: &str = "channel-join";
    /// client→server: leave a named channel
    pub const LEAVE_ROOM: &str = "leave-room";
    /// client→server: explicit player registration
    pub const REGISTER_PLAYER: &str = "register-player";
    /// both directions: one input event
    pub const CONTROLLER_INPUT: &str = "controller-input";
    /// server→client: liveness probe `{t}`
    pub const PING: &str = "ping";
    /// client→server: probe echo `{t}`
    pub const PONG: &str = "pong";
}

/// One outbound message queued for a connection.
///
/// The payload is shared between every recipient of a broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: &'static str,
    pub payload: Arc<Value>,
}

impl Frame {
    pub fn new(event: &'static str, payload: Value) -> Self {
        Self {
            event,
            payload: Arc::new(payload),
        }
    }

    pub fn input(event: InputEvent) -> Self {
        Self::new(events::CONTROLLER_INPUT, event.into_value())
    }

    pub fn probe(probe: Probe) -> Self {
        Self::new(events::PING, serde_json::json!({ "t": probe.t }))
    }
}
