//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::domain::InterestRegistry;
use crate::upstream::HomeAssistantClient;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// REST client for the upstream instance; also carries its endpoints.
    pub client: HomeAssistantClient,
    /// Entities the frontend currently displays; shared by every relay.
    pub interest: Arc<InterestRegistry>,
    /// Per-relay tunables.
    pub relay: RelayConfig,
}

impl AppState {
    /// Builds state with a fresh, empty interest registry.
    #[must_use]
    pub fn new(client: HomeAssistantClient, relay: RelayConfig) -> Self {
        Self {
            client,
            interest: Arc::new(InterestRegistry::new()),
            relay,
        }
    }
}
