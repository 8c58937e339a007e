//! Connection endpoints: read-only views of the live registry.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::{ConnectionId, ConnectionSummary};
use crate::error::GatewayError;

/// `GET /api/v1/connections` — Point-in-time list of live connections.
#[utoipa::path(
    get,
    path = "/api/v1/connections",
    tag = "Connections",
    summary = "List connections",
    description = "Returns a snapshot of every registered connection, oldest first.",
    responses(
        (status = 200, description = "Registry snapshot", body = Vec<ConnectionSummary>),
    )
)]
pub async fn list_connections(State(state): State<AppState>) -> Json<Vec<ConnectionSummary>> {
    Json(state.registry().summaries().await)
}

/// `GET /api/v1/connections/{id}` — One live connection.
///
/// # Errors
///
/// Returns [`GatewayError::ConnectionNotFound`] if the connection is not
/// registered.
#[utoipa::path(
    get,
    path = "/api/v1/connections/{id}",
    tag = "Connections",
    summary = "Get connection",
    params(("id" = ConnectionId, Path, description = "Connection identifier")),
    responses(
        (status = 200, description = "Connection found", body = ConnectionSummary),
        (status = 404, description = "No such live connection"),
    )
)]
pub async fn get_connection(
    State(state): State<AppState>,
    Path(id): Path<ConnectionId>,
) -> Result<Json<ConnectionSummary>, GatewayError> {
    state
        .registry()
        .get(id)
        .await
        .map(|conn| Json(conn.summary()))
        .ok_or(GatewayError::ConnectionNotFound(id))
}

/// Connection routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/connections", get(list_connections))
        .route("/connections/{id}", get(get_connection))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::Connection;
    use crate::engine::InMemorySubscriptionEngine;
    use crate::ws::HandlerConfig;

    fn state() -> AppState {
        AppState::new(
            Arc::new(InMemorySubscriptionEngine::new()),
            HandlerConfig::default(),
        )
    }

    async fn get(state: AppState, uri: &str) -> StatusCode {
        let app = routes().with_state(state);
        let Ok(request) = Request::builder().uri(uri).body(Body::empty()) else {
            panic!("valid request");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("router is infallible");
        };
        response.status()
    }

    #[tokio::test]
    async fn list_is_ok_when_empty() {
        assert_eq!(get(state(), "/connections").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_connection_is_404() {
        let uri = format!("/connections/{}", ConnectionId::new());
        assert_eq!(get(state(), &uri).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn registered_connection_is_found() {
        let state = state();
        let (conn, _rx) = Connection::new(None, 4);
        state.coordinator.register(&conn).await;

        let uri = format!("/connections/{}", conn.id());
        assert_eq!(get(state, &uri).await, StatusCode::OK);
    }
}
