//! Interest registry endpoints: the frontend declares which entities it
//! is displaying, and every relay filters upstream traffic down to them.

use std::collections::HashSet;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    SelectedEntitiesResponse, SetSelectedEntitiesRequest, SetSelectedEntitiesResponse,
};
use crate::app_state::AppState;
use crate::domain::{EntityId, is_mmwave_entity};

/// `POST /api/selected-entities` — Replace the selected entity set.
#[utoipa::path(
    post,
    path = "/api/selected-entities",
    tag = "Entities",
    summary = "Replace selected entities",
    description = "Replaces the process-wide set of entities whose events are relayed over /ws. Duplicates collapse; the previous set is discarded.",
    request_body = SetSelectedEntitiesRequest,
    responses(
        (status = 200, description = "Selection stored", body = SetSelectedEntitiesResponse),
    )
)]
pub async fn set_selected_entities(
    State(state): State<AppState>,
    Json(req): Json<SetSelectedEntitiesRequest>,
) -> Json<SetSelectedEntitiesResponse> {
    let eligible = {
        let distinct: HashSet<&str> = req.entity_ids.iter().map(EntityId::as_str).collect();
        let (eligible, ineligible): (Vec<&str>, Vec<&str>) =
            distinct.into_iter().partition(|id| is_mmwave_entity(id));
        if !ineligible.is_empty() {
            tracing::debug!(?ineligible, "selected entities outside the mmWave catalog");
        }
        eligible.len()
    };

    let count = state.interest.set(req.entity_ids).await;
    tracing::debug!(count, "selected entities replaced");

    Json(SetSelectedEntitiesResponse {
        success: true,
        count,
        eligible,
    })
}

/// `GET /api/selected-entities` — Current selection.
#[utoipa::path(
    get,
    path = "/api/selected-entities",
    tag = "Entities",
    summary = "Get selected entities",
    description = "Returns the current selection in sorted order with its size.",
    responses(
        (status = 200, description = "Current selection", body = SelectedEntitiesResponse),
    )
)]
pub async fn get_selected_entities(State(state): State<AppState>) -> Json<SelectedEntitiesResponse> {
    let (entity_ids, count) = state.interest.get().await;
    Json(SelectedEntitiesResponse { entity_ids, count })
}

/// Selection routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/selected-entities",
        get(get_selected_entities).post(set_selected_entities),
    )
}
