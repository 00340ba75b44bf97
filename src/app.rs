//! Router assembly shared by the binary and the integration tests.

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the full application: REST API, docs, and the `/ws` relay.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
