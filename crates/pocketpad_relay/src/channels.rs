//! Named channel (room) membership.
//!
//! Channels group connections for scoped delivery, e.g. two couch sessions
//! sharing one relay. A connection may sit in any number of channels.
//! Empty channels are removed.

use dashmap::DashMap;
use std::collections::BTreeSet;

use crate::connection::ConnectionId;

/// Bidirectional channel ↔ connection index.
///
/// The two maps are never locked at the same time.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    members: DashMap<String, BTreeSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, BTreeSet<String>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connection` to `channel`. Returns false if it was already a member.
    pub fn join(&self, connection: &ConnectionId, channel: &str) -> bool {
        let added = self
            .members
            .entry(channel.to_string())
            .or_default()
            .insert(connection.clone());
        self.memberships
            .entry(connection.clone())
            .or_default()
            .insert(channel.to_string());
        added
    }

    /// Removes `connection` from `channel`. Returns false if it was not a member.
    pub fn leave(&self, connection: &ConnectionId, channel: &str) -> bool {
        let removed = self.remove_member(channel, connection);
        if let Some(mut channels) = self.memberships.get_mut(connection) {
            channels.remove(channel);
        }
        self.memberships.remove_if(connection, |_, channels| channels.is_empty());
        removed
    }

    /// Removes `connection` from every channel, returning the channels it left.
    pub fn leave_all(&self, connection: &ConnectionId) -> Vec<String> {
        let channels = self
            .memberships
            .remove(connection)
            .map(|(_, channels)| channels)
            .unwrap_or_default();
        for channel in &channels {
            self.remove_member(channel, connection);
        }
        channels.into_iter().collect()
    }

    /// Current members of `channel`, in id order.
    pub fn members(&self, channel: &str) -> Vec<ConnectionId> {
        self.members
            .get(channel)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Channels `connection` has joined, in name order.
    pub fn channels_of(&self, connection: &ConnectionId) -> Vec<String> {
        self.memberships
            .get(connection)
            .map(|channels| channels.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, connection: &ConnectionId, channel: &str) -> bool {
        self.members
            .get(channel)
            .map(|members| members.contains(connection))
            .unwrap_or(false)
    }

    pub fn channel_count(&self) -> usize {
        self.members.len()
    }

    fn remove_member(&self, channel: &str, connection: &ConnectionId) -> bool {
        let removed = self
            .members
            .get_mut(channel)
            .map(|mut members| members.remove(connection))
            .unwrap_or(false);
        self.members.remove_if(channel, |_, members| members.is_empty());
        removed
    }
}
