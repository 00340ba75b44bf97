//! Read-side forwarding: template rendering and entity state.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::TemplateRequest;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /api/template` — Render a template on the upstream.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if no template is given, and
/// upstream status or transport errors otherwise.
#[utoipa::path(
    post,
    path = "/api/template",
    tag = "Proxy",
    summary = "Render a template",
    description = "Forwards the template to the upstream template endpoint and returns the rendered output with the upstream content type.",
    request_body = TemplateRequest,
    responses(
        (status = 200, description = "Rendered template", body = String),
        (status = 400, description = "No template provided", body = ErrorResponse),
        (status = 502, description = "Upstream unreachable", body = ErrorResponse),
        (status = 504, description = "Upstream timed out", body = ErrorResponse),
    )
)]
pub async fn render_template(
    State(state): State<AppState>,
    Json(req): Json<TemplateRequest>,
) -> Result<Response, GatewayError> {
    let template = req
        .template
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest("no template provided".to_string()))?;

    let upstream = state
        .client
        .render_template(&template)
        .await?
        .error_for_status()?;

    let content_type = upstream
        .content_type
        .unwrap_or_else(|| "application/json".to_string());
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        upstream.body,
    )
        .into_response())
}

/// `GET /api/entities/{entity_id}` — Fetch one entity's state.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for a malformed id, and
/// upstream status or transport errors otherwise.
#[utoipa::path(
    get,
    path = "/api/entities/{entity_id}",
    tag = "Proxy",
    summary = "Get entity state",
    description = "Returns the upstream state object for a single entity.",
    params(
        ("entity_id" = String, Path, description = "Entity id, e.g. sensor.office_target_1_x"),
    ),
    responses(
        (status = 200, description = "Entity state", body = serde_json::Value),
        (status = 400, description = "Malformed entity id", body = ErrorResponse),
        (status = 404, description = "Entity not found", body = ErrorResponse),
    )
)]
pub async fn get_entity_state(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    if !is_valid_entity_id(&entity_id) {
        return Err(GatewayError::InvalidRequest(format!(
            "malformed entity id: {entity_id}"
        )));
    }

    let upstream = state
        .client
        .entity_state(&entity_id)
        .await?
        .error_for_status()?;

    serde_json::from_str(&upstream.body)
        .map(Json)
        .map_err(|e| GatewayError::Internal(format!("upstream returned invalid JSON: {e}")))
}

/// Entity ids are `<domain>.<object_id>` built from `[A-Za-z0-9_]`.
fn is_valid_entity_id(entity_id: &str) -> bool {
    let Some((domain, object_id)) = entity_id.split_once('.') else {
        return false;
    };
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    valid(domain) && valid(object_id)
}

/// Read-side forwarding routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/template", post(render_template))
        .route("/entities/{entity_id}", get(get_entity_state))
}
