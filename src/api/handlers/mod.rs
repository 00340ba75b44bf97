//! REST endpoint handlers organized by resource.

pub mod entities;
pub mod proxy;
pub mod services;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(system::routes())
        .merge(entities::routes())
        .merge(proxy::routes())
        .merge(services::routes())
}
