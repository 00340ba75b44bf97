//! DTOs for the forwarding endpoints.
//!
//! Request fields are optional at the serde level so that a missing field
//! yields a 400 with a clear message instead of a generic rejection.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Request body for `POST /api/template`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TemplateRequest {
    /// Jinja template source.
    pub template: Option<String>,
}

/// Request body for service calls that only target an entity.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EntityServiceRequest {
    /// Target entity.
    pub entity_id: Option<String>,
}

/// Request body for `number.set_value`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetValueRequest {
    /// Target entity.
    pub entity_id: Option<String>,
    /// New value; passed to the upstream unchanged.
    #[schema(value_type = Object)]
    pub value: Option<serde_json::Value>,
}

/// Request body for `select.select_option`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SelectOptionRequest {
    /// Target entity.
    pub entity_id: Option<String>,
    /// Option to select.
    #[schema(value_type = Object)]
    pub option: Option<serde_json::Value>,
}

/// Service-call payload forwarded upstream.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCall {
    /// Target entity.
    pub entity_id: String,
    /// `value` for `number.set_value`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// `option` for `select.select_option`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<serde_json::Value>,
}

impl ServiceCall {
    /// Payload targeting `entity_id` with no extra data.
    #[must_use]
    pub fn entity(entity_id: String) -> Self {
        Self {
            entity_id,
            value: None,
            option: None,
        }
    }
}

/// Success body for service calls.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceCallResponse {
    /// Human-readable confirmation.
    pub message: String,
}

/// Returns the entity id, or a 400 if it is missing or empty.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when `entity_id` is absent.
pub fn require_entity_id(entity_id: Option<String>) -> Result<String, GatewayError> {
    entity_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest("missing entity_id".to_string()))
}

/// Returns the value, or a 400 naming the missing field. JSON `null`
/// counts as missing.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when the field is absent.
pub fn require_field(
    value: Option<serde_json::Value>,
    field: &str,
) -> Result<serde_json::Value, GatewayError> {
    value
        .filter(|v| !v.is_null())
        .ok_or_else(|| GatewayError::InvalidRequest(format!("missing {field}")))
}
