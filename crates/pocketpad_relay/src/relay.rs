//! Event relay and connection lifecycle.
//!
//! The [`Relay`] ties the player registry, the subscriber hub and the channel
//! index together. Transports call into it once per wire event; it never
//! touches transport internals.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::channels::ChannelRegistry;
use crate::config::RelayConfig;
use crate::connection::registry::RegisteredPlayer;
use crate::connection::{ConnectionId, ConnectionState, PlayerRegistry};
use crate::error::RelayError;
use crate::hub::{BroadcastReport, Hub};
use crate::messaging::{Frame, InputEvent, PlayerIdentity};

/// Result of relaying one input event.
#[derive(Debug, Clone, PartialEq)]
pub struct InputOutcome {
    /// Identity assigned by fallback registration, if it happened
    pub registered: Option<PlayerIdentity>,
    pub report: BroadcastReport,
}

/// Point-in-time view served on the status route.
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub connections: usize,
    pub registered: usize,
    pub channels: usize,
    pub frames_dropped: u64,
    pub players: Vec<RegisteredPlayer>,
}

/// Input relay shared by every connection handler.
#[derive(Debug)]
pub struct Relay {
    registry: Arc<PlayerRegistry>,
    hub: Arc<Hub>,
    channels: Arc<ChannelRegistry>,
    channel_scoped_input: bool,
}

impl Relay {
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_parts(
            Arc::new(PlayerRegistry::new()),
            Arc::new(Hub::new(config.outbound_queue_capacity)),
            Arc::new(ChannelRegistry::new()),
            config.channel_scoped_input,
        )
    }

    fn with_parts(
        registry: Arc<PlayerRegistry>,
        hub: Arc<Hub>,
        channels: Arc<ChannelRegistry>,
        channel_scoped_input: bool,
    ) -> Self {
        Self {
            registry,
            hub,
            channels,
            channel_scoped_input,
        }
    }

    pub fn registry(&self) -> &Arc<PlayerRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.channels
    }

    /// Accepts a connection. The returned receiver yields every frame the
    /// relay queues for it until [`disconnect`](Self::disconnect).
    pub fn connect(&self, id: ConnectionId) -> mpsc::Receiver<Frame> {
        debug!("Connection {} opened", id);
        self.hub.subscribe(id)
    }

    /// Explicit `register-player`. Returns the identity it replaced.
    pub fn register_player(
        &self,
        id: &ConnectionId,
        player: PlayerIdentity,
    ) -> Result<Option<PlayerIdentity>, RelayError> {
        let previous = self.register_live(id, player.clone())?;
        info!("PLAYER_CONNECTED: {}", player);
        Ok(previous)
    }

    /// Relays one input event to all live connections.
    ///
    /// An unregistered sender that names a player is registered first.
    pub fn handle_input(&self, id: &ConnectionId, event: InputEvent) -> InputOutcome {
        let registered = self.fallback_register(id, &event);

        let frame = Frame::input(event);
        let report = match self.input_scope(id) {
            Some(members) => self.hub.broadcast_to(members.iter(), &frame),
            None => self.hub.broadcast(&frame),
        };

        InputOutcome { registered, report }
    }

    /// Like [`handle_input`](Self::handle_input) for an untyped payload.
    /// Non-object payloads are dropped.
    pub fn handle_raw_input(&self, id: &ConnectionId, payload: Value) -> Option<InputOutcome> {
        match InputEvent::from_value(payload) {
            Ok(event) => Some(self.handle_input(id, event)),
            Err(e) => {
                debug!("Dropping controller-input from {}: {}", id, e);
                None
            }
        }
    }

    /// Adds a live connection to a channel.
    pub fn join_channel(&self, id: &ConnectionId, channel: &str) -> Result<bool, RelayError> {
        if !self.hub.is_subscribed(id) {
            return Err(RelayError::UnknownConnection(id.clone()));
        }
        let joined = self.channels.join(id, channel);
        // a disconnect in between has already run leave_all
        if !self.hub.is_subscribed(id) {
            self.channels.leave_all(id);
            return Err(RelayError::UnknownConnection(id.clone()));
        }
        if joined {
            info!("Socket {} joined room {}", id, channel);
        }
        Ok(joined)
    }

    pub fn leave_channel(&self, id: &ConnectionId, channel: &str) -> bool {
        let left = self.channels.leave(id, channel);
        if left {
            info!("Socket {} left room {}", id, channel);
        }
        left
    }

    /// Closes a connection: registry entry, channel memberships and outbound
    /// queue all go. Safe to call more than once.
    pub fn disconnect(&self, id: &ConnectionId) -> Option<PlayerIdentity> {
        if let Some(connection) = self.hub.unsubscribe(id) {
            let open_for = connection.connected_at.elapsed().unwrap_or_default();
            debug!("Connection {} was open for {:.1?}", id, open_for);
        }
        self.channels.leave_all(id);
        let player = self.registry.remove(id);
        match &player {
            Some(player) => info!("PLAYER_DISCONNECTED: {}", player),
            None => debug!("Connection {} closed", id),
        }
        player
    }

    pub fn state(&self, id: &ConnectionId) -> ConnectionState {
        if !self.hub.is_subscribed(id) {
            ConnectionState::Disconnected
        } else if self.registry.is_registered(id) {
            ConnectionState::Registered
        } else {
            ConnectionState::Connected
        }
    }

    pub fn status(&self) -> RelayStatus {
        RelayStatus {
            connections: self.hub.len(),
            registered: self.registry.len(),
            channels: self.channels.channel_count(),
            frames_dropped: self.hub.frames_dropped(),
            players: self.registry.snapshot(),
        }
    }

    fn fallback_register(&self, id: &ConnectionId, event: &InputEvent) -> Option<PlayerIdentity> {
        if self.registry.is_registered(id) {
            return None;
        }
        let player = event.player()?;
        match self.register_live(id, player.clone()) {
            Ok(_) => {
                info!("PLAYER_CONNECTED: {}", player);
                Some(player)
            }
            Err(e) => {
                debug!("Skipping fallback registration: {}", e);
                None
            }
        }
    }

    /// Registers only while the connection is live, so a handler racing a
    /// disconnect cannot leave a dead entry behind.
    fn register_live(
        &self,
        id: &ConnectionId,
        player: PlayerIdentity,
    ) -> Result<Option<PlayerIdentity>, RelayError> {
        if !self.hub.is_subscribed(id) {
            return Err(RelayError::UnknownConnection(id.clone()));
        }
        let previous = self.registry.register(id.clone(), player);
        if !self.hub.is_subscribed(id) {
            self.registry.remove(id);
            return Err(RelayError::UnknownConnection(id.clone()));
        }
        Ok(previous)
    }

    /// Recipients for input from `id` when channel scoping applies.
    fn input_scope(&self, id: &ConnectionId) -> Option<Vec<ConnectionId>> {
        if !self.channel_scoped_input {
            return None;
        }
        let channels = self.channels.channels_of(id);
        if channels.is_empty() {
            return None;
        }
        let mut members: Vec<ConnectionId> = channels
            .iter()
            .flat_map(|channel| self.channels.members(channel))
            .collect();
        members.sort();
        members.dedup();
        Some(members)
    }
}
