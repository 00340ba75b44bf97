//! System endpoints: health check and startup connectivity probe.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::config::CredentialSource;
use crate::upstream::HomeAssistantClient;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"running"` when the gateway answers.
    pub backend_status: &'static str,
    /// Gateway version.
    pub version: &'static str,
    /// RFC 3339 time of the check.
    pub timestamp: String,
    /// Upstream API root that was probed.
    pub ha_api_url: String,
    /// Upstream probe status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ha_response_status: Option<u16>,
    /// Upstream probe content type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ha_response_type: Option<String>,
    /// Probe failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the supervisor credential is in use.
    pub supervisor_token_available: bool,
    /// Whether an explicit upstream URL is in use.
    pub ha_url_override: bool,
}

/// `GET /api/health` — Backend status plus an upstream probe.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    summary = "Health check",
    description = "Probes the upstream API root and reports the result together with the active credential source.",
    responses(
        (status = 200, description = "Backend running; probe result included", body = HealthResponse),
        (status = 500, description = "Upstream probe failed", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let client = &state.client;
    let source = client.target().source();
    let mut body = HealthResponse {
        backend_status: "running",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        ha_api_url: client.api_url(""),
        ha_response_status: None,
        ha_response_type: None,
        error: None,
        supervisor_token_available: source == CredentialSource::Supervisor,
        ha_url_override: source == CredentialSource::External,
    };

    match client.probe().await {
        Ok(response) => {
            body.ha_response_status = Some(response.status);
            body.ha_response_type =
                Some(response.content_type.unwrap_or_else(|| "unknown".to_string()));
            (StatusCode::OK, Json(body))
        }
        Err(e) => {
            body.error = Some(e.to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
        }
    }
}

/// Probes the upstream once and logs if it is unreachable or unhealthy.
///
/// Meant to run in the background at startup; it never fails the process.
pub async fn check_connectivity(client: HomeAssistantClient) {
    match client.probe().await {
        Ok(response) if response.status == 200 => {
            tracing::info!(url = %client.api_url(""), "upstream API reachable");
        }
        Ok(response) => {
            let preview: String = response.body.chars().take(200).collect();
            tracing::error!(
                status = response.status,
                response = %preview,
                "failed to connect to upstream API"
            );
        }
        Err(e) => tracing::error!(error = %e, "exception connecting to upstream API"),
    }
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
