//! REST API layer: system and admin endpoints plus OpenAPI documentation.
//!
//! Admin endpoints are mounted under `/api/v1`; `/health` sits at the root.

pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::domain::{ConnectionId, ConnectionState, ConnectionSummary};

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::system::health_handler,
        handlers::connections::list_connections,
        handlers::connections::get_connection,
    ),
    components(schemas(ConnectionSummary, ConnectionState, ConnectionId)),
    tags(
        (name = "System", description = "Service health"),
        (name = "Connections", description = "Live graphql-ws connections"),
    )
)]
pub struct ApiDoc;

/// Builds the complete REST router.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
