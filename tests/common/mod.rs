//! Shared helpers for integration tests: spawn a gateway, connect clients.

#![allow(clippy::panic, dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use graphql_ws_gateway::app_state::AppState;
use graphql_ws_gateway::engine::{InMemorySubscriptionEngine, SubscriptionEngine};
use graphql_ws_gateway::server::build_app;
use graphql_ws_gateway::ws::HandlerConfig;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub engine: Arc<InMemorySubscriptionEngine>,
}

/// Handler settings with keep-alives off so tests see only protocol frames.
pub fn quiet_config() -> HandlerConfig {
    HandlerConfig {
        keep_alive: None,
        ..HandlerConfig::default()
    }
}

pub async fn spawn_server(handler: HandlerConfig) -> TestServer {
    let engine = Arc::new(InMemorySubscriptionEngine::new());
    let state = AppState::new(Arc::clone(&engine) as Arc<dyn SubscriptionEngine>, handler);
    let app = build_app(state.clone(), "/graphql");

    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        addr,
        state,
        engine,
    }
}

/// Opens a WebSocket offering `protocol` (or none).
pub async fn try_connect(
    addr: SocketAddr,
    protocol: Option<&'static str>,
    bearer: Option<&str>,
) -> Result<Client, tokio_tungstenite::tungstenite::Error> {
    let Ok(mut request) = format!("ws://{addr}/graphql").into_client_request() else {
        panic!("valid ws url");
    };
    if let Some(protocol) = protocol {
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(protocol));
    }
    if let Some(token) = bearer {
        let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) else {
            panic!("valid header");
        };
        request.headers_mut().insert("Authorization", value);
    }
    tokio_tungstenite::connect_async(request)
        .await
        .map(|(ws, _response)| ws)
}

pub async fn connect(addr: SocketAddr) -> Client {
    let Ok(ws) = try_connect(addr, Some("graphql-ws"), None).await else {
        panic!("graphql-ws handshake failed");
    };
    ws
}

pub async fn send(ws: &mut Client, frame: Value) {
    let Ok(()) = ws.send(Message::text(frame.to_string())).await else {
        panic!("failed to send frame");
    };
}

/// Reads the next text frame as JSON, failing after two seconds.
pub async fn recv(ws: &mut Client) -> Value {
    loop {
        let Ok(next) = tokio::time::timeout(Duration::from_secs(2), ws.next()).await else {
            panic!("timed out waiting for a frame");
        };
        match next {
            Some(Ok(Message::Text(text))) => {
                let Ok(value) = serde_json::from_str(text.as_str()) else {
                    panic!("server sent invalid JSON: {text}");
                };
                return value;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Sends `connection_init` and expects `connection_ack`.
pub async fn init(ws: &mut Client) {
    send(ws, serde_json::json!({ "type": "connection_init", "payload": {} })).await;
    let ack = recv(ws).await;
    assert_eq!(ack["type"], "connection_ack");
}

/// Returns `true` if the server closed the socket within two seconds.
pub async fn closed_by_server(ws: &mut Client) -> bool {
    loop {
        let Ok(next) = tokio::time::timeout(Duration::from_secs(2), ws.next()).await else {
            return false;
        };
        match next {
            Some(Ok(Message::Close(_)) | Err(_)) | None => return true,
            Some(Ok(_)) => {}
        }
    }
}

/// Polls `check` until it holds, failing after two seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held: {what}");
}
