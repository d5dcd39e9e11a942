//! One Socket.IO connection to the relay.

use anyhow::{Context, Result};
use futures::FutureExt;
use pocketpad_relay::{events, Probe};
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// HTTP base URL for the Socket.IO client.
///
/// Accepts `http(s)://`, `ws(s)://` or a bare `host:port`.
pub fn base_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("ws://") {
        format!("http://{rest}")
    } else if let Some(rest) = base.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if base.starts_with("http://") || base.starts_with("https://") {
        base.to_string()
    } else {
        format!("http://{base}")
    }
}

/// `None` marks the end of the connection.
type Inbox = mpsc::UnboundedReceiver<Option<(String, Value)>>;

pub struct PadSession {
    client: Client,
    inbox: Inbox,
}

impl PadSession {
    /// Connects to the default namespace.
    ///
    /// Incoming application events are queued for [`next_event`](Self::next_event);
    /// relay `ping` probes are echoed as `pong` as soon as they arrive.
    pub async fn connect(base: &str) -> Result<Self> {
        let url = base_url(base);
        let (tx, inbox) = mpsc::unbounded_channel();
        let closed = tx.clone();

        let client = ClientBuilder::new(url.as_str())
            .on_any(move |event: Event, payload: Payload, socket: Client| {
                let tx = tx.clone();
                async move {
                    let Event::Custom(name) = event else {
                        return;
                    };
                    let data = first_value(payload);
                    if name == events::PING {
                        if let Some(probe) = Probe::from_value(&data) {
                            if let Err(e) = socket.emit(events::PONG, json!({ "t": probe.t })).await {
                                debug!("Failed to answer probe: {}", e);
                            }
                        }
                    }
                    let _ = tx.send(Some((name, data)));
                }
                .boxed()
            })
            .on("close", move |_: Payload, _: Client| {
                let closed = closed.clone();
                async move {
                    let _ = closed.send(None);
                }
                .boxed()
            })
            .on("error", |err: Payload, _: Client| {
                async move { warn!("⚠️ Socket error: {:?}", err) }.boxed()
            })
            .connect()
            .await
            .with_context(|| format!("connecting to {url}"))?;

        info!("🔌 Connected to {}", url);
        Ok(Self { client, inbox })
    }

    pub async fn emit(&self, name: &str, data: Value) -> Result<()> {
        self.client
            .emit(name.to_string(), data)
            .await
            .with_context(|| format!("emitting {name}"))
    }

    /// Next application event, `None` once the connection is closed.
    pub async fn next_event(&mut self) -> Option<(String, Value)> {
        self.inbox.recv().await.flatten()
    }

    pub async fn close(self) -> Result<()> {
        self.client.disconnect().await.context("disconnecting")
    }
}

/// Socket.IO events carry their data as the first array element.
fn first_value(payload: Payload) -> Value {
    match payload {
        Payload::Text(mut values) if !values.is_empty() => values.swap_remove(0),
        _ => Value::Null,
    }
}
