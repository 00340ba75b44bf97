//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::relay::run_relay;
use crate::app_state::AppState;

/// `GET /ws` — Upgrade HTTP connection to WebSocket and start a relay.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let target = state.client.target().clone();
    let interest = Arc::clone(&state.interest);
    let config = state.relay;

    ws.on_upgrade(move |socket| run_relay(socket, target, interest, config))
}
