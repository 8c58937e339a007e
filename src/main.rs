//! graphql-ws-gateway server entry point.
//!
//! Starts the Axum HTTP server with the graphql-ws endpoint and REST
//! system routes, backed by the in-memory subscription engine.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use graphql_ws_gateway::app_state::AppState;
use graphql_ws_gateway::auth::AuthHooks;
use graphql_ws_gateway::config::{GatewayConfig, LogFormat};
use graphql_ws_gateway::engine::InMemorySubscriptionEngine;
use graphql_ws_gateway::server::{build_app, shutdown_signal};
use graphql_ws_gateway::ws::HandlerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
    tracing::info!(addr = %config.listen_addr, ws_path = %config.ws_path, "starting graphql-ws-gateway");

    // Build engine and handler settings
    let engine = Arc::new(InMemorySubscriptionEngine::new());
    let handler = HandlerConfig {
        auth: AuthHooks::none(),
        keep_alive: config.keep_alive(),
        outbound_capacity: config.outbound_queue_capacity,
    };
    let state = AppState::new(engine, handler);

    // Build router
    let app = build_app(state.clone(), &config.ws_path);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}
