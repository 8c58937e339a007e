//! REST system and admin endpoints against a live server.

#![allow(clippy::panic)]

mod common;

use graphql_ws_gateway::api::handlers::system::HealthResponse;

use common::{connect, init, quiet_config, spawn_server};

async fn get_json<T: serde::de::DeserializeOwned>(url: String) -> (reqwest::StatusCode, Option<T>) {
    let Ok(response) = reqwest::get(&url).await else {
        panic!("request to {url} failed");
    };
    let status = response.status();
    (status, response.json::<T>().await.ok())
}

#[tokio::test]
async fn health_reports_live_connections() {
    let server = spawn_server(quiet_config()).await;
    let mut ws = connect(server.addr).await;
    init(&mut ws).await;

    let (status, body) = get_json::<HealthResponse>(format!("http://{}/health", server.addr)).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    let Some(body) = body else {
        panic!("health body should decode");
    };
    assert_eq!(body.status, "healthy");
    assert_eq!(body.connections, 1);
}

#[tokio::test]
async fn connections_endpoint_lists_operations() {
    let server = spawn_server(quiet_config()).await;
    let mut ws = connect(server.addr).await;
    init(&mut ws).await;

    let (status, body) =
        get_json::<serde_json::Value>(format!("http://{}/api/v1/connections", server.addr)).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    let Some(serde_json::Value::Array(items)) = body else {
        panic!("expected a JSON array");
    };
    assert_eq!(items.len(), 1);
    assert_eq!(items.first().map(|c| c["state"].clone()), Some("active".into()));
    assert_eq!(
        items.first().map(|c| c["id"].clone()),
        server
            .state
            .registry()
            .summaries()
            .await
            .first()
            .map(|s| serde_json::json!(s.id))
    );
}

#[tokio::test]
async fn unknown_connection_is_not_found() {
    let server = spawn_server(quiet_config()).await;
    let (status, body) = get_json::<serde_json::Value>(format!(
        "http://{}/api/v1/connections/{}",
        server.addr,
        uuid::Uuid::new_v4()
    ))
    .await;

    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    assert_eq!(body.map(|b| b["error"]["code"].clone()), Some(2001.into()));
}
