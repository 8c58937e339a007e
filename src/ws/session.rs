//! Per-connection graphql-ws session loop.
//!
//! Reads frames from the peer and turns them into connection events, drains
//! the connection's outbound queue into the socket, and sends keep-alives
//! once the connection has been acknowledged. Every way out of the loop
//! (peer close, read error, `connection_terminate`, server shutdown,
//! write failure) converges on a single [`Connection::close`].
//!
//! Frames are handled one at a time, so events for one connection are
//! serialized. Replies to a client frame are written to the socket before
//! the next frame is read; only engine-produced frames go through the
//! bounded outbound queue.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::handler::HandlerConfig;
use super::messages::{InitPayload, MessageType, OperationMessage, StartPayload};
use crate::auth::TokenAuthenticator;
use crate::domain::{Connection, ConnectionEventHandler, ConnectionId};
use crate::error::GatewayError;

/// What the loop should do after a client frame has been handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep reading.
    #[default]
    Continue,
    /// `connection_ack` was sent; keep-alives may start.
    Acknowledged,
    /// The peer asked to terminate.
    Terminate,
}

/// Result of handling one client frame.
#[derive(Debug, Default)]
pub struct Outcome {
    /// How the loop continues.
    pub flow: Dispatch,
    /// Frames to write back to the peer, in order.
    pub replies: Vec<OperationMessage>,
}

impl Outcome {
    fn reply(msg: OperationMessage) -> Self {
        Self {
            flow: Dispatch::Continue,
            replies: vec![msg],
        }
    }

    fn rejected(err: &GatewayError) -> Self {
        Self::reply(OperationMessage::connection_error(err.to_string()))
    }
}

type WsSink = SplitSink<WebSocket, Message>;

/// Runs the read/write loop for one registered connection until it closes.
pub async fn run_session(
    socket: WebSocket,
    conn: Arc<Connection>,
    mut outbound: mpsc::Receiver<OperationMessage>,
    handler: Arc<dyn ConnectionEventHandler>,
    config: Arc<HandlerConfig>,
    mut shutdown: watch::Receiver<bool>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let token_auth = config.auth.connection.as_deref();
    let mut keep_alive: Option<Interval> = None;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let outcome = dispatch(&conn, text.as_str(), handler.as_ref(), token_auth).await;
                        if !write_all(&mut ws_tx, conn.id(), &outcome.replies).await {
                            break;
                        }
                        match outcome.flow {
                            Dispatch::Continue => {}
                            Dispatch::Acknowledged => {
                                if keep_alive.is_none() {
                                    keep_alive = config.keep_alive.map(keep_alive_timer);
                                }
                            }
                            Dispatch::Terminate => break,
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(conn = %conn.id(), error = %err, "ws read failed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            Some(frame) = outbound.recv() => {
                if !write_frame(&mut ws_tx, conn.id(), &frame).await {
                    break;
                }
            }
            () = next_tick(&mut keep_alive) => {
                if !write_frame(&mut ws_tx, conn.id(), &OperationMessage::keep_alive()).await {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    conn.close(handler.as_ref()).await;
    let _ = ws_tx.send(Message::Close(None)).await;
    tracing::debug!(conn = %conn.id(), "ws connection closed");
}

/// Writes one frame. Returns `false` once the socket can no longer be written.
async fn write_frame(ws_tx: &mut WsSink, conn: ConnectionId, frame: &OperationMessage) -> bool {
    match serde_json::to_string(frame) {
        Ok(json) => ws_tx.send(Message::text(json)).await.is_ok(),
        Err(err) => {
            tracing::warn!(conn = %conn, error = %err, "failed to encode frame");
            true
        }
    }
}

async fn write_all(ws_tx: &mut WsSink, conn: ConnectionId, frames: &[OperationMessage]) -> bool {
    for frame in frames {
        if !write_frame(ws_tx, conn, frame).await {
            return false;
        }
    }
    true
}

/// Handles one text frame from the peer and returns the replies for it.
pub async fn dispatch(
    conn: &Arc<Connection>,
    text: &str,
    handler: &dyn ConnectionEventHandler,
    token_auth: Option<&dyn TokenAuthenticator>,
) -> Outcome {
    let msg = match serde_json::from_str::<OperationMessage>(text) {
        Ok(msg) => msg,
        Err(err) => return Outcome::rejected(&GatewayError::from(err)),
    };

    match msg.msg_type {
        MessageType::ConnectionInit => init(conn, &msg, token_auth).await,
        MessageType::Start => match required_id(&msg) {
            Ok(op_id) => start(conn, op_id, &msg, handler).await,
            Err(err) => Outcome::rejected(&err),
        },
        MessageType::Stop => match required_id(&msg) {
            Ok(op_id) => {
                stop(conn, op_id, handler).await;
                Outcome::default()
            }
            Err(err) => Outcome::rejected(&err),
        },
        MessageType::ConnectionTerminate => Outcome {
            flow: Dispatch::Terminate,
            replies: Vec::new(),
        },
        other => {
            tracing::debug!(conn = %conn.id(), msg_type = ?other, "unexpected message from client");
            Outcome::rejected(&GatewayError::Protocol(format!(
                "unexpected message type {other:?}"
            )))
        }
    }
}

fn required_id(msg: &OperationMessage) -> Result<&str, GatewayError> {
    msg.id.as_deref().ok_or_else(|| {
        GatewayError::Protocol(format!("{:?} message requires an id", msg.msg_type))
    })
}

async fn init(
    conn: &Connection,
    msg: &OperationMessage,
    token_auth: Option<&dyn TokenAuthenticator>,
) -> Outcome {
    let payload = match msg.decode_payload::<Option<InitPayload>>() {
        Ok(payload) => payload.unwrap_or_default(),
        Err(err) => {
            return Outcome::reply(OperationMessage::connection_error(format!(
                "invalid connection_init payload: {err}"
            )));
        }
    };

    if let Some(auth) = token_auth {
        match auth.authenticate(&payload.auth_token).await {
            Ok(principal) => conn.set_principal(Some(principal)),
            Err(err) => {
                tracing::debug!(conn = %conn.id(), error = %err, "connection authentication failed");
                return Outcome::reply(OperationMessage::connection_error(format!(
                    "Failed to authenticate user: {err}"
                )));
            }
        }
    }

    Outcome {
        flow: Dispatch::Acknowledged,
        replies: vec![OperationMessage::ack()],
    }
}

async fn start(
    conn: &Arc<Connection>,
    op_id: &str,
    msg: &OperationMessage,
    handler: &dyn ConnectionEventHandler,
) -> Outcome {
    let payload = match msg.decode_payload::<StartPayload>() {
        Ok(payload) => payload,
        Err(err) => {
            return Outcome::reply(OperationMessage::error(
                op_id,
                [format!("failed to parse start payload: {err}")],
            ));
        }
    };

    // Marked active before the engine sees it so an initial result pushed
    // from inside add_subscription is delivered.
    let fresh = conn.begin_operation(op_id);
    let errors = handler.on_start_operation(conn, op_id, payload).await;
    if errors.is_empty() {
        return Outcome::default();
    }
    if fresh {
        conn.end_operation(op_id);
    }
    tracing::debug!(conn = %conn.id(), op = op_id, errors = errors.len(), "operation rejected");
    Outcome::reply(OperationMessage::error(
        op_id,
        errors.iter().map(ToString::to_string),
    ))
}

async fn stop(conn: &Arc<Connection>, op_id: &str, handler: &dyn ConnectionEventHandler) {
    conn.end_operation(op_id);
    handler.on_stop_operation(conn, op_id).await;
}

fn keep_alive_timer(period: Duration) -> Interval {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
