//! Per-peer session object.
//!
//! A [`Connection`] is created once the handshake has been negotiated and
//! authenticated. It is transport-agnostic: frames produced by the engine
//! (`data`, `complete`) are pushed into a bounded queue that the session
//! loop drains into the socket, so the same type backs both the live
//! WebSocket path and in-process tests. Replies to client frames do not go
//! through this queue; the session loop writes them directly.
//!
//! Lifecycle: `Constructed → Active → Closing → Closed`. The transition into
//! `Closing` is one-shot; it is the guard that makes [`Connection::close`]
//! safe against duplicate close signals from the transport.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use utoipa::ToSchema;

use super::{ConnectionEventHandler, ConnectionId};
use crate::auth::Principal;
use crate::ws::messages::{DataPayload, OperationMessage};

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Built but not yet in the registry.
    Constructed,
    /// Registered; start/stop events are accepted.
    Active,
    /// Close handler is running.
    Closing,
    /// Terminal. Subscriptions torn down and registry entry removed.
    Closed,
}

/// A live client session.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    connected_at: DateTime<Utc>,
    principal: RwLock<Option<Principal>>,
    outbound: mpsc::Sender<OperationMessage>,
    operations: Mutex<BTreeSet<String>>,
    state: Mutex<ConnectionState>,
}

/// Point-in-time view of a connection for listing endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConnectionSummary {
    /// Connection identifier.
    pub id: ConnectionId,
    /// Authenticated principal, `null` when anonymous.
    #[schema(value_type = Option<Object>)]
    pub user: Option<Principal>,
    /// Handshake completion time.
    pub connected_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Active operation ids, sorted.
    pub operations: Vec<String>,
}

impl Connection {
    /// Creates a connection and the receiving end of its outbound queue.
    ///
    /// `capacity` bounds the number of frames waiting to be written; a
    /// capacity of zero is raised to one.
    #[must_use]
    pub fn new(
        principal: Option<Principal>,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<OperationMessage>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let conn = Arc::new(Self {
            id: ConnectionId::new(),
            connected_at: Utc::now(),
            principal: RwLock::new(principal),
            outbound,
            operations: Mutex::new(BTreeSet::new()),
            state: Mutex::new(ConnectionState::Constructed),
        });
        (conn, rx)
    }

    /// Returns the connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns when the handshake completed.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Returns the current principal, `None` when anonymous.
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        self.principal.read().clone()
    }

    /// Replaces the principal after connection-level authentication.
    pub fn set_principal(&self, principal: Option<Principal>) {
        *self.principal.write() = principal;
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// `true` once closing has begun.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Closing | ConnectionState::Closed
        )
    }

    /// Returns `true` if `op_id` is an active operation on this connection.
    #[must_use]
    pub fn has_operation(&self, op_id: &str) -> bool {
        self.operations.lock().contains(op_id)
    }

    /// Returns the active operation ids, sorted.
    #[must_use]
    pub fn operation_ids(&self) -> Vec<String> {
        self.operations.lock().iter().cloned().collect()
    }

    /// Returns a point-in-time summary.
    #[must_use]
    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            id: self.id,
            user: self.principal(),
            connected_at: self.connected_at,
            state: self.state(),
            operations: self.operation_ids(),
        }
    }

    /// Pushes a `data` frame for `op_id` to the peer.
    ///
    /// Returns `false` if the operation is not active, the connection is
    /// closing, or the outbound queue is full. Never fails otherwise.
    pub fn send_data(&self, op_id: &str, payload: &DataPayload) -> bool {
        if !self.has_operation(op_id) {
            return false;
        }
        self.send(OperationMessage::data(op_id, payload))
    }

    /// Ends `op_id` from the server side and tells the peer with `complete`.
    ///
    /// Returns `false` if the operation was not active.
    pub fn complete(&self, op_id: &str) -> bool {
        if !self.end_operation(op_id) {
            return false;
        }
        self.send(OperationMessage::complete(op_id))
    }

    /// Enqueues a frame. Returns `false` instead of failing when the frame
    /// cannot be delivered.
    fn send(&self, msg: OperationMessage) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.outbound.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(conn = %self.id, "outbound queue full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Records `op_id` as active. Returns `false` if it already was.
    pub(crate) fn begin_operation(&self, op_id: &str) -> bool {
        self.operations.lock().insert(op_id.to_string())
    }

    /// Forgets `op_id`. Returns `false` if it was not active.
    pub(crate) fn end_operation(&self, op_id: &str) -> bool {
        self.operations.lock().remove(op_id)
    }

    /// `Constructed → Active`. Called by the coordinator on registration.
    pub(crate) fn mark_active(&self) {
        let mut state = self.state.lock();
        if *state == ConnectionState::Constructed {
            *state = ConnectionState::Active;
        }
    }

    /// One-shot transition into `Closing`. Returns `true` for the caller
    /// that wins it.
    fn begin_close(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            ConnectionState::Constructed | ConnectionState::Active => {
                *state = ConnectionState::Closing;
                true
            }
            ConnectionState::Closing | ConnectionState::Closed => false,
        }
    }

    fn finish_close(&self) {
        self.operations.lock().clear();
        *self.state.lock() = ConnectionState::Closed;
    }

    /// Retires this connection through `handler`'s close event.
    ///
    /// Only the first call has any effect; later calls return immediately,
    /// even while the first is still running.
    pub async fn close(self: &Arc<Self>, handler: &dyn ConnectionEventHandler) {
        if !self.begin_close() {
            return;
        }
        handler.on_close(self).await;
        self.finish_close();
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::ws::messages::MessageType;

    fn payload() -> DataPayload {
        DataPayload {
            data: Some(serde_json::json!({"foo": 1})),
            errors: None,
        }
    }

    #[test]
    fn new_connection_is_constructed() {
        let (conn, _rx) = Connection::new(None, 4);
        assert_eq!(conn.state(), ConnectionState::Constructed);
        assert!(conn.principal().is_none());
        assert!(conn.operation_ids().is_empty());
    }

    #[tokio::test]
    async fn send_data_reaches_outbound_queue() {
        let (conn, mut rx) = Connection::new(None, 4);
        assert!(conn.begin_operation("op1"));
        assert!(conn.send_data("op1", &payload()));

        let Some(msg) = rx.recv().await else {
            panic!("expected a frame");
        };
        assert_eq!(msg.msg_type, MessageType::Data);
        assert_eq!(msg.id.as_deref(), Some("op1"));
    }

    #[test]
    fn send_data_for_unknown_operation_is_not_delivered() {
        let (conn, _rx) = Connection::new(None, 4);
        assert!(!conn.send_data("nope", &payload()));
    }

    #[test]
    fn send_data_on_full_queue_is_not_delivered() {
        let (conn, _rx) = Connection::new(None, 1);
        conn.begin_operation("op1");
        assert!(conn.send_data("op1", &payload()));
        assert!(!conn.send_data("op1", &payload()));
    }

    #[test]
    fn send_data_after_receiver_dropped_is_not_delivered() {
        let (conn, rx) = Connection::new(None, 4);
        conn.begin_operation("op1");
        drop(rx);
        assert!(!conn.send_data("op1", &payload()));
    }

    #[test]
    fn complete_ends_operation_once() {
        let (conn, _rx) = Connection::new(None, 4);
        conn.begin_operation("op1");
        assert!(conn.complete("op1"));
        assert!(!conn.has_operation("op1"));
        assert!(!conn.complete("op1"));
    }

    #[test]
    fn begin_operation_reports_duplicates() {
        let (conn, _rx) = Connection::new(None, 4);
        assert!(conn.begin_operation("op1"));
        assert!(!conn.begin_operation("op1"));
        assert_eq!(conn.operation_ids(), vec!["op1".to_string()]);
    }

    #[test]
    fn close_transition_is_one_shot() {
        let (conn, _rx) = Connection::new(None, 4);
        conn.mark_active();
        assert_eq!(conn.state(), ConnectionState::Active);
        assert!(conn.begin_close());
        assert!(!conn.begin_close());
        conn.finish_close();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(!conn.begin_close());
    }

    #[test]
    fn closed_connection_rejects_frames() {
        let (conn, _rx) = Connection::new(None, 4);
        conn.begin_operation("op1");
        assert!(conn.begin_close());
        assert!(!conn.send_data("op1", &payload()));
        assert!(!conn.complete("op1"));
    }

    #[test]
    fn principal_can_be_replaced() {
        let (conn, _rx) = Connection::new(Some(Principal::from("anon")), 4);
        conn.set_principal(Some(Principal::from("alice")));
        assert_eq!(conn.summary().user, Some(Principal::from("alice")));
    }
}
