//! Authoritative set of live connections.
//!
//! [`ConnectionRegistry`] keeps every live connection in one `HashMap`
//! behind a single [`tokio::sync::Mutex`]. The set is small and touched only
//! on connect, disconnect and admin listing, so one coarse lock is enough.
//!
//! # Concurrency
//!
//! - Every read and write takes the same lock.
//! - The lock is held only for the map operation itself. Callers must never
//!   hold it across a call into the subscription engine.
//! - Enumeration returns a copy; the raw map is never exposed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{Connection, ConnectionId, ConnectionSummary};

/// Registry of currently-open connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a connection. Each connection is registered exactly once;
    /// a duplicate insert replaces the previous entry and is logged.
    pub async fn add(&self, conn: Arc<Connection>) {
        let id = conn.id();
        let previous = self.connections.lock().await.insert(id, conn);
        if previous.is_some() {
            tracing::warn!(conn = %id, "connection registered twice");
        }
    }

    /// Removes a connection. Returns `false` if it was not present.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        self.connections.lock().await.remove(&id).is_some()
    }

    /// Returns `true` if the connection is live.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.lock().await.contains_key(&id)
    }

    /// Returns a handle to a live connection.
    pub async fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.lock().await.get(&id).map(Arc::clone)
    }

    /// Returns a point-in-time copy of all live connections.
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections
            .lock()
            .await
            .values()
            .map(Arc::clone)
            .collect()
    }

    /// Returns summaries of all live connections, oldest first.
    ///
    /// Summaries are built after the lock is released.
    pub async fn summaries(&self) -> Vec<ConnectionSummary> {
        let mut summaries: Vec<_> = self
            .snapshot()
            .await
            .iter()
            .map(|conn| conn.summary())
            .collect();
        summaries.sort_by_key(|s| s.connected_at);
        summaries
    }

    /// Returns the number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Returns `true` if no connection is live.
    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }
}
