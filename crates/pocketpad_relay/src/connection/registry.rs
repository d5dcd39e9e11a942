//! Connection → player identity table.
//!
//! Shared by the relay (registration, lookups on input) and the prober
//! (lookups on pong). Every operation is non-blocking from the caller's point
//! of view: `DashMap` shards lock only for the duration of a single insert,
//! get or remove.

use dashmap::DashMap;
use serde::Serialize;

use super::ConnectionId;
use crate::messaging::PlayerIdentity;

/// One registered connection, as reported by [`PlayerRegistry::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredPlayer {
    pub connection: ConnectionId,
    pub player: PlayerIdentity,
}

/// In-memory registry mapping connections to player identities.
///
/// Identities are not unique: two connections may claim the same player and
/// both entries are kept. Re-registering a connection overwrites its entry.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: DashMap<ConnectionId, PlayerIdentity>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the entry for `connection`.
    ///
    /// Returns the identity it replaced, if any.
    pub fn register(&self, connection: ConnectionId, player: PlayerIdentity) -> Option<PlayerIdentity> {
        self.players.insert(connection, player)
    }

    /// Player identity registered for `connection`, if any.
    pub fn lookup(&self, connection: &ConnectionId) -> Option<PlayerIdentity> {
        self.players.get(connection).map(|entry| entry.value().clone())
    }

    /// Removes the entry for `connection`. Removing an absent entry is a no-op.
    pub fn remove(&self, connection: &ConnectionId) -> Option<PlayerIdentity> {
        self.players.remove(connection).map(|(_, player)| player)
    }

    pub fn is_registered(&self, connection: &ConnectionId) -> bool {
        self.players.contains_key(connection)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// All entries, ordered by player then connection.
    pub fn snapshot(&self) -> Vec<RegisteredPlayer> {
        let mut players: Vec<RegisteredPlayer> = self
            .players
            .iter()
            .map(|entry| RegisteredPlayer {
                connection: entry.key().clone(),
                player: entry.value().clone(),
            })
            .collect();
        players.sort_by(|a, b| a.player.cmp(&b.player).then_with(|| a.connection.cmp(&b.connection)));
        players
    }
}
