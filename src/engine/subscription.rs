//! Subscription record handed to the engine.

use std::fmt;
use std::sync::{Arc, Weak};

use serde_json::{Map, Value};

use crate::domain::{Connection, ConnectionId};
use crate::ws::messages::{DataPayload, StartPayload};

/// Result-delivery callback. Returns `false` when the payload could not be
/// delivered.
pub type SendDataFn = Arc<dyn Fn(&DataPayload) -> bool + Send + Sync>;

/// A started operation on one connection.
///
/// Identity is `(connection_id, id)`; `id` alone is only unique within its
/// connection. The back-reference to the connection is weak, so a
/// subscription never keeps its connection alive.
#[derive(Clone)]
pub struct Subscription {
    /// Operation id chosen by the peer.
    pub id: String,
    /// Owning connection.
    pub connection_id: ConnectionId,
    /// GraphQL document source text.
    pub query: String,
    /// Operation variables.
    pub variables: Option<Map<String, Value>>,
    /// Selected operation name.
    pub operation_name: Option<String>,
    connection: Weak<Connection>,
    send_data: SendDataFn,
}

impl Subscription {
    /// Builds the record for a start event. Delivery forwards to
    /// [`Connection::send_data`] for this operation id.
    #[must_use]
    pub fn new(conn: &Arc<Connection>, op_id: &str, payload: StartPayload) -> Self {
        let weak = Arc::downgrade(conn);
        let id = op_id.to_string();
        let send_data: SendDataFn = {
            let weak = weak.clone();
            let id = id.clone();
            Arc::new(move |data: &DataPayload| {
                weak.upgrade()
                    .is_some_and(|conn| conn.send_data(&id, data))
            })
        };
        Self {
            id,
            connection_id: conn.id(),
            query: payload.query,
            variables: payload.variables,
            operation_name: payload.operation_name,
            connection: weak,
            send_data,
        }
    }

    /// Builds a record identified only by `(conn, op_id)`, for removal.
    #[must_use]
    pub fn for_removal(conn: &Arc<Connection>, op_id: &str) -> Self {
        Self {
            id: op_id.to_string(),
            connection_id: conn.id(),
            query: String::new(),
            variables: None,
            operation_name: None,
            connection: Arc::downgrade(conn),
            send_data: Arc::new(|_| false),
        }
    }

    /// Delivers a result to the peer. `false` means it was not delivered.
    pub fn send_data(&self, payload: &DataPayload) -> bool {
        (self.send_data)(payload)
    }

    /// Returns the owning connection if it is still alive.
    #[must_use]
    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.upgrade()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("connection_id", &self.connection_id)
            .field("query", &self.query)
            .field("variables", &self.variables)
            .field("operation_name", &self.operation_name)
            .finish_non_exhaustive()
    }
}
