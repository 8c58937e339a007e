//! Axum WebSocket upgrade handler and subprotocol negotiation.
//!
//! Accepts the upgrade offering only `graphql-ws`. After the upgrade the
//! negotiated subprotocol is checked before any authentication or registry
//! work; a peer that did not agree on `graphql-ws` has its socket closed
//! and never gets a connection.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use axum::response::IntoResponse;

use super::messages::GRAPHQL_WS_PROTOCOL;
use super::session::run_session;
use crate::app_state::AppState;
use crate::auth::{AuthHooks, HandshakeRequest};
use crate::domain::{Connection, ConnectionEventHandler};

/// Settings resolved once when the handler is built.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Authentication hooks.
    pub auth: AuthHooks,
    /// Interval between `ka` frames after `connection_ack`; `None` disables.
    pub keep_alive: Option<Duration>,
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            auth: AuthHooks::none(),
            keep_alive: Some(Duration::from_secs(30)),
            outbound_capacity: 256,
        }
    }
}

/// `GET <ws_path>` — Upgrade HTTP connection to a graphql-ws session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let request = HandshakeRequest {
        method,
        uri,
        headers,
    };

    ws.protocols([GRAPHQL_WS_PROTOCOL])
        .on_failed_upgrade(|err| {
            tracing::warn!(error = %err, "failed to establish websocket connection");
        })
        .on_upgrade(move |socket| accept(socket, request, state))
}

/// Returns `true` if the upgrade settled on the graphql-ws subprotocol.
#[must_use]
pub fn is_graphql_ws(protocol: Option<&HeaderValue>) -> bool {
    protocol.is_some_and(|p| p.as_bytes() == GRAPHQL_WS_PROTOCOL.as_bytes())
}

async fn accept(mut socket: WebSocket, request: HandshakeRequest, state: AppState) {
    if !is_graphql_ws(socket.protocol()) {
        tracing::warn!(uri = %request.uri, "connection does not implement the graphql-ws protocol");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let shutdown = state.shutdown.subscribe();
    let shutting_down = *shutdown.borrow();
    if shutting_down {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let principal = state.handler.auth.authenticate_request(&request).await;
    let (conn, outbound) = Connection::new(principal, state.handler.outbound_capacity);
    state.coordinator.register(&conn).await;

    let handler: Arc<dyn ConnectionEventHandler> = Arc::clone(&state.coordinator) as _;
    run_session(
        socket,
        conn,
        outbound,
        handler,
        Arc::clone(&state.handler),
        shutdown,
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_graphql_ws() {
        assert!(is_graphql_ws(Some(&HeaderValue::from_static("graphql-ws"))));
        assert!(!is_graphql_ws(Some(&HeaderValue::from_static("chat"))));
        assert!(!is_graphql_ws(Some(&HeaderValue::from_static(
            "graphql-transport-ws"
        ))));
        assert!(!is_graphql_ws(None));
    }

    #[test]
    fn default_config_keeps_alive() {
        let config = HandlerConfig::default();
        assert_eq!(config.keep_alive, Some(Duration::from_secs(30)));
        assert!(config.auth.request.is_none());
        assert!(config.auth.connection.is_none());
    }
}
