//! DTOs for the selected-entities endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::EntityId;

/// Request body for `POST /api/selected-entities`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetSelectedEntitiesRequest {
    /// Full replacement set of entity ids. Missing means "none".
    #[serde(default)]
    pub entity_ids: Vec<EntityId>,
}

/// Response for `POST /api/selected-entities`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SetSelectedEntitiesResponse {
    /// Always `true` on a 200.
    pub success: bool,
    /// Distinct ids now selected.
    pub count: usize,
    /// How many of them are recognised mmWave attributes.
    pub eligible: usize,
}

/// Response for `GET /api/selected-entities`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SelectedEntitiesResponse {
    /// Currently selected ids, sorted.
    pub entity_ids: Vec<EntityId>,
    /// Number of selected ids.
    pub count: usize,
}
