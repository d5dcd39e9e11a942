//! Socket.IO event handlers.
//!
//! Per-event handlers are synchronous closures: socketioxide runs them inline
//! while reading a socket's packets, so one connection's events reach the
//! relay in the order they arrived.

use serde_json::Value;
use socketioxide::extract::{Data, SocketRef};
use socketioxide::socket::DisconnectReason;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::connection::ConnectionId;
use crate::messaging::{events, Frame, PlayerIdentity, Probe};
use crate::prober::Prober;
use crate::relay::Relay;

/// Connection id for a socket.
pub fn connection_id(socket: &SocketRef) -> ConnectionId {
    ConnectionId::from(socket.id.to_string())
}

/// Namespace connect handler: subscribes the socket and installs its
/// event handlers.
pub fn handle_connection(socket: SocketRef, relay: Arc<Relay>, prober: Arc<Prober>) {
    let id = connection_id(&socket);
    let outbound = relay.connect(id.clone());
    spawn_writer(socket.clone(), id, outbound);
    setup_socket_handlers(&socket, relay, prober);
}

/// Drains a connection's outbound queue into its socket.
fn spawn_writer(socket: SocketRef, id: ConnectionId, mut outbound: mpsc::Receiver<Frame>) {
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = socket.emit(frame.event, frame.payload.as_ref()) {
                debug!("Failed to emit {} to {}: {}", frame.event, id, e);
            }
        }
        debug!("Writer for {} finished", id);
    });
}

fn setup_socket_handlers(socket: &SocketRef, relay: Arc<Relay>, prober: Arc<Prober>) {
    for event in [events::JOIN_ROOM, events::CHANNEL_JOIN] {
        let relay = relay.clone();
        socket.on(event, move |socket: SocketRef, Data(channel): Data<Value>| {
            let id = connection_id(&socket);
            match channel_name(&channel) {
                Some(channel) => {
                    if let Err(e) = relay.join_channel(&id, &channel) {
                        warn!("Join failed for {}: {}", id, e);
                    }
                }
                None => debug!("Ignoring {} from {} without a channel name", event, id),
            }
        });
    }

    {
        let relay = relay.clone();
        socket.on(events::LEAVE_ROOM, move |socket: SocketRef, Data(channel): Data<Value>| {
            if let Some(channel) = channel_name(&channel) {
                relay.leave_channel(&connection_id(&socket), &channel);
            }
        });
    }

    {
        let relay = relay.clone();
        socket.on(events::REGISTER_PLAYER, move |socket: SocketRef, Data(player): Data<Value>| {
            let id = connection_id(&socket);
            match PlayerIdentity::from_value(&player) {
                Some(player) => {
                    if let Err(e) = relay.register_player(&id, player) {
                        warn!("Registration failed for {}: {}", id, e);
                    }
                }
                None => debug!("Ignoring register-player from {} without an identity", id),
            }
        });
    }

    {
        let relay = relay.clone();
        socket.on(events::CONTROLLER_INPUT, move |socket: SocketRef, Data(payload): Data<Value>| {
            relay.handle_raw_input(&connection_id(&socket), payload);
        });
    }

    socket.on(events::PONG, move |socket: SocketRef, Data(payload): Data<Value>| {
        let id = connection_id(&socket);
        match Probe::from_value(&payload) {
            Some(probe) => {
                prober.on_pong(&id, probe);
            }
            None => debug!("Ignoring pong from {} without a timestamp", id),
        }
    });

    socket.on_disconnect(move |socket: SocketRef, reason: DisconnectReason| {
        let id = connection_id(&socket);
        debug!("Socket {} disconnected: {:?}", id, reason);
        relay.disconnect(&id);
    });
}

/// Channel names arrive as strings; the phone UI may also send numbers.
fn channel_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
