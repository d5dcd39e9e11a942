//! Per-player controller state rebuilt from relayed input events.

use pocketpad_relay::{InputEvent, InputKind, PlayerIdentity};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PadState {
    pub axes: BTreeMap<String, f64>,
    pub held: BTreeSet<String>,
    pub events: u64,
}

impl PadState {
    pub fn axis(&self, name: &str) -> f64 {
        self.axes.get(name).copied().unwrap_or(0.0)
    }
}

impl fmt::Display for PadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lx = self.axis("LX");
        let ly = self.axis("LY");
        let rx = self.axis("RX");
        let ry = self.axis("RY");
        write!(f, "L({lx:+.2},{ly:+.2}) R({rx:+.2},{ry:+.2})")?;
        if !self.held.is_empty() {
            let held: Vec<&str> = self.held.iter().map(String::as_str).collect();
            write!(f, " [{}]", held.join(" "))?;
        }
        Ok(())
    }
}

/// Tracks every player seen on the relay.
#[derive(Debug, Default)]
pub struct PadBoard {
    players: BTreeMap<PlayerIdentity, PadState>,
    anonymous: u64,
}

impl PadBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event and returns the sender's updated state.
    /// Events without a player are only counted.
    pub fn apply(&mut self, event: &InputEvent) -> Option<(&PlayerIdentity, &PadState)> {
        let Some(player) = event.player() else {
            self.anonymous += 1;
            return None;
        };

        let state = self.players.entry(player.clone()).or_default();
        state.events += 1;
        match event.kind() {
            InputKind::Axis { name, value } => {
                state.axes.insert(name, value);
            }
            InputKind::Button { name, value } => {
                if value > 0.0 {
                    state.held.insert(name);
                } else {
                    state.held.remove(&name);
                }
            }
            InputKind::Other(_) => {}
        }
        self.players.get_key_value(&player)
    }

    pub fn get(&self, player: &PlayerIdentity) -> Option<&PadState> {
        self.players.get(player)
    }

    pub fn players(&self) -> impl Iterator<Item = (&PlayerIdentity, &PadState)> {
        self.players.iter()
    }

    pub fn anonymous_events(&self) -> u64 {
        self.anonymous
    }
}
