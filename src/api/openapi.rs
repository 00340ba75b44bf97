//! OpenAPI document for the REST endpoints.
//!
//! The JSON document is always served at `/api-docs/openapi.json`; the
//! `swagger-ui` feature adds an interactive viewer at `/swagger-ui`.

use axum::Router;
use utoipa::OpenApi;

use super::handlers::{entities, proxy, services, system};
use crate::app_state::AppState;

/// Generated OpenAPI description.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "mmwave-gateway",
        description = "REST forwarding and entity selection for the mmWave zone configurator."
    ),
    paths(
        system::health_handler,
        entities::set_selected_entities,
        entities::get_selected_entities,
        proxy::render_template,
        proxy::get_entity_state,
        services::number_set_value,
        services::select_option,
        services::switch_turn_on,
        services::switch_turn_off,
        services::light_turn_on,
        services::light_turn_off,
    ),
    tags(
        (name = "System", description = "Health and connectivity"),
        (name = "Entities", description = "Entity selection for the event relay"),
        (name = "Proxy", description = "Read-side forwarding"),
        (name = "Services", description = "Service-call forwarding"),
    )
)]
pub struct ApiDoc;

const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Documentation routes.
#[cfg(feature = "swagger-ui")]
pub fn routes() -> Router<AppState> {
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()),
    )
}

/// Documentation routes.
#[cfg(not(feature = "swagger-ui"))]
pub fn routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_relay_selection_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/selected-entities"));
        assert!(doc.paths.paths.contains_key("/api/services/number/set_value"));
        assert!(doc.paths.paths.contains_key("/api/entities/{entity_id}"));
    }
}
