//! Core relay server implementation.
//!
//! [`RelayServer`] wires the relay and prober onto an axum router with a
//! socketioxide layer, serves the controller UI from disk and owns the
//! listener.

use axum::{routing::get, Router};
use socketioxide::{extract::SocketRef, layer::SocketIoLayer, SocketIo};
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use super::handlers::handle_connection;
use super::routes::{health_handler, players_handler};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::prober::Prober;
use crate::relay::Relay;
use crate::shutdown::ShutdownState;

/// The relay server.
///
/// Construction registers the Socket.IO namespace; nothing listens until
/// [`bind`](Self::bind) / [`serve`](Self::serve) or [`start`](Self::start).
pub struct RelayServer {
    config: RelayConfig,
    relay: Arc<Relay>,
    prober: Arc<Prober>,
    socket_io: SocketIo,
    socket_layer: SocketIoLayer,
    shutdown: ShutdownState,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;

        let relay = Arc::new(Relay::new(&config));
        let prober = Arc::new(Prober::new(
            relay.registry().clone(),
            relay.hub().clone(),
            config.ping_interval(),
        ));

        let (socket_layer, socket_io) = SocketIo::new_layer();

        {
            let relay = relay.clone();
            let prober = prober.clone();
            socket_io.ns("/", move |socket: SocketRef| {
                handle_connection(socket, relay.clone(), prober.clone());
            });
        }

        Ok(Self {
            config,
            relay,
            prober,
            socket_io,
            socket_layer,
            shutdown: ShutdownState::new(),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    pub fn prober(&self) -> &Arc<Prober> {
        &self.prober
    }

    pub fn socket_io(&self) -> &SocketIo {
        &self.socket_io
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.shutdown.clone()
    }

    /// Builds the HTTP application: status routes, Socket.IO and the static UI.
    pub fn router(&self) -> Router {
        let mut app = Router::new()
            .route("/health", get(health_handler))
            .route("/api/players", get(players_handler))
            .with_state(self.relay.clone());

        match &self.config.static_dir {
            Some(dir) => {
                if !dir.is_dir() {
                    warn!("Static UI directory {} not found", dir.display());
                }
                app = app.fallback_service(ServeDir::new(dir));
            }
            None => info!("Static UI disabled"),
        }

        app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(self.socket_layer.clone()),
        )
    }

    /// Binds the configured address. Failure here is fatal for the process.
    pub async fn bind(&self) -> Result<TcpListener, RelayError> {
        let address = self.config.bind_address;
        TcpListener::bind(address)
            .await
            .map_err(|source| RelayError::Bind { address, source })
    }

    /// Serves on an already bound listener until shutdown is initiated.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), RelayError> {
        let local = listener
            .local_addr()
            .map_err(|e| RelayError::Network(e.to_string()))?;
        info!("Server running on http://{}", announce_address(local));

        let prober_handle = self.prober.clone().spawn(self.shutdown.clone());
        let app = self.router();
        let shutdown = self.shutdown.clone();

        let result = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await
            .map_err(|e| RelayError::Network(e.to_string()));

        // covers a serve error that ended the loop without a shutdown signal
        self.shutdown.initiate_shutdown();
        prober_handle.abort();
        self.shutdown.complete_shutdown();
        result
    }

    /// Binds and serves.
    pub async fn start(&self) -> Result<(), RelayError> {
        info!("🚀 Starting relay on {}", self.config.bind_address);
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Stops probing and lets the HTTP server drain.
    pub fn shutdown(&self) {
        self.shutdown.initiate_shutdown();
    }
}

/// Address phones should use: the LAN address when bound to all interfaces.
fn announce_address(local: SocketAddr) -> SocketAddr {
    if local.ip().is_unspecified() {
        if let Some(ip) = lan_address() {
            return SocketAddr::new(ip, local.port());
        }
    }
    local
}

/// Primary outbound interface address. Connecting a UDP socket sends nothing.
fn lan_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}
