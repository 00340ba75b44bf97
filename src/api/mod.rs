//! REST API layer: route handlers, DTOs, OpenAPI document, and router
//! composition.
//!
//! All endpoints are mounted under `/api`, matching the paths the
//! configurator frontend calls.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api", handlers::routes())
        .merge(openapi::routes())
}
