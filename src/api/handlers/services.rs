//! Write-side forwarding: number, switch, light, and select service calls.
//!
//! Each endpoint validates its body, forwards one
//! `POST <api_base>/services/<domain>/<service>`, and answers with a short
//! confirmation message.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    EntityServiceRequest, SelectOptionRequest, ServiceCall, ServiceCallResponse, SetValueRequest,
    require_entity_id, require_field,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

async fn forward(
    state: &AppState,
    domain: &str,
    service: &str,
    call: ServiceCall,
    message: String,
) -> Result<Json<ServiceCallResponse>, GatewayError> {
    state
        .client
        .call_service(domain, service, &call)
        .await?
        .error_for_status()?;
    tracing::info!(domain, service, entity_id = %call.entity_id, "service call forwarded");
    Ok(Json(ServiceCallResponse { message }))
}

/// `POST /api/services/number/set_value`
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if `entity_id` or `value` is
/// missing, and upstream errors otherwise.
#[utoipa::path(
    post,
    path = "/api/services/number/set_value",
    tag = "Services",
    summary = "Set a number entity",
    request_body = SetValueRequest,
    responses(
        (status = 200, description = "Value set", body = ServiceCallResponse),
        (status = 400, description = "Missing entity_id or value", body = ErrorResponse),
    )
)]
pub async fn number_set_value(
    State(state): State<AppState>,
    Json(req): Json<SetValueRequest>,
) -> Result<Json<ServiceCallResponse>, GatewayError> {
    let entity_id = require_entity_id(req.entity_id)?;
    let value = require_field(req.value, "value")?;
    let message = format!("Entity {entity_id} updated successfully.");
    let call = ServiceCall {
        value: Some(value),
        ..ServiceCall::entity(entity_id)
    };
    forward(&state, "number", "set_value", call, message).await
}

/// `POST /api/services/select/select_option`
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if `entity_id` or `option` is
/// missing, and upstream errors otherwise.
#[utoipa::path(
    post,
    path = "/api/services/select/select_option",
    tag = "Services",
    summary = "Choose a select option",
    request_body = SelectOptionRequest,
    responses(
        (status = 200, description = "Option selected", body = ServiceCallResponse),
        (status = 400, description = "Missing entity_id or option", body = ErrorResponse),
    )
)]
pub async fn select_option(
    State(state): State<AppState>,
    Json(req): Json<SelectOptionRequest>,
) -> Result<Json<ServiceCallResponse>, GatewayError> {
    let entity_id = require_entity_id(req.entity_id)?;
    let option = require_field(req.option, "option")?;
    let message = format!("Select entity {entity_id} updated successfully.");
    let call = ServiceCall {
        option: Some(option),
        ..ServiceCall::entity(entity_id)
    };
    forward(&state, "select", "select_option", call, message).await
}

/// `POST /api/services/switch/turn_on`
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if `entity_id` is missing, and
/// upstream errors otherwise.
#[utoipa::path(
    post,
    path = "/api/services/switch/turn_on",
    tag = "Services",
    summary = "Turn a switch on",
    request_body = EntityServiceRequest,
    responses(
        (status = 200, description = "Switch turned on", body = ServiceCallResponse),
        (status = 400, description = "Missing entity_id", body = ErrorResponse),
    )
)]
pub async fn switch_turn_on(
    State(state): State<AppState>,
    Json(req): Json<EntityServiceRequest>,
) -> Result<Json<ServiceCallResponse>, GatewayError> {
    let entity_id = require_entity_id(req.entity_id)?;
    let message = format!("Switch {entity_id} turned on successfully.");
    forward(&state, "switch", "turn_on", ServiceCall::entity(entity_id), message).await
}

/// `POST /api/services/switch/turn_off`
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if `entity_id` is missing, and
/// upstream errors otherwise.
#[utoipa::path(
    post,
    path = "/api/services/switch/turn_off",
    tag = "Services",
    summary = "Turn a switch off",
    request_body = EntityServiceRequest,
    responses(
        (status = 200, description = "Switch turned off", body = ServiceCallResponse),
        (status = 400, description = "Missing entity_id", body = ErrorResponse),
    )
)]
pub async fn switch_turn_off(
    State(state): State<AppState>,
    Json(req): Json<EntityServiceRequest>,
) -> Result<Json<ServiceCallResponse>, GatewayError> {
    let entity_id = require_entity_id(req.entity_id)?;
    let message = format!("Switch {entity_id} turned off successfully.");
    forward(&state, "switch", "turn_off", ServiceCall::entity(entity_id), message).await
}

/// `POST /api/services/light/turn_on`
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if `entity_id` is missing, and
/// upstream errors otherwise.
#[utoipa::path(
    post,
    path = "/api/services/light/turn_on",
    tag = "Services",
    summary = "Turn a light on",
    request_body = EntityServiceRequest,
    responses(
        (status = 200, description = "Light turned on", body = ServiceCallResponse),
        (status = 400, description = "Missing entity_id", body = ErrorResponse),
    )
)]
pub async fn light_turn_on(
    State(state): State<AppState>,
    Json(req): Json<EntityServiceRequest>,
) -> Result<Json<ServiceCallResponse>, GatewayError> {
    let entity_id = require_entity_id(req.entity_id)?;
    let message = format!("Light {entity_id} turned on successfully.");
    forward(&state, "light", "turn_on", ServiceCall::entity(entity_id), message).await
}

/// `POST /api/services/light/turn_off`
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if `entity_id` is missing, and
/// upstream errors otherwise.
#[utoipa::path(
    post,
    path = "/api/services/light/turn_off",
    tag = "Services",
    summary = "Turn a light off",
    request_body = EntityServiceRequest,
    responses(
        (status = 200, description = "Light turned off", body = ServiceCallResponse),
        (status = 400, description = "Missing entity_id", body = ErrorResponse),
    )
)]
pub async fn light_turn_off(
    State(state): State<AppState>,
    Json(req): Json<EntityServiceRequest>,
) -> Result<Json<ServiceCallResponse>, GatewayError> {
    let entity_id = require_entity_id(req.entity_id)?;
    let message = format!("Light {entity_id} turned off successfully.");
    forward(&state, "light", "turn_off", ServiceCall::entity(entity_id), message).await
}

/// Service-call routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/services/number/set_value", post(number_set_value))
        .route("/services/select/select_option", post(select_option))
        .route("/services/switch/turn_on", post(switch_turn_on))
        .route("/services/switch/turn_off", post(switch_turn_off))
        .route("/services/light/turn_on", post(light_turn_on))
        .route("/services/light/turn_off", post(light_turn_off))
}
