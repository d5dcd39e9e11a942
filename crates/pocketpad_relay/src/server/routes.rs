//! Plain HTTP routes served next to the Socket.IO endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::relay::Relay;

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Registered players and connection counts.
pub async fn players_handler(State(relay): State<Arc<Relay>>) -> impl IntoResponse {
    Json(relay.status())
}
