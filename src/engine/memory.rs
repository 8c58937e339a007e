//! In-memory subscription bookkeeping.
//!
//! [`InMemorySubscriptionEngine`] stores subscriptions per connection in a
//! `RwLock<HashMap<..>>` and fans published payloads out to every stored
//! delivery callback. It performs no query parsing or execution.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Subscription, SubscriptionEngine, SubscriptionError};
use crate::domain::{Connection, ConnectionId};
use crate::ws::messages::DataPayload;

/// Bookkeeping-only engine keyed by connection, then operation id.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionEngine {
    subscriptions: RwLock<HashMap<ConnectionId, HashMap<String, Subscription>>>,
}

impl InMemorySubscriptionEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `payload` to every subscription. Returns how many accepted it.
    pub async fn publish(&self, payload: &DataPayload) -> usize {
        let map = self.subscriptions.read().await;
        map.values()
            .flat_map(HashMap::values)
            .filter(|sub| sub.send_data(payload))
            .count()
    }

    /// Returns the total number of subscriptions.
    pub async fn count(&self) -> usize {
        self.subscriptions
            .read()
            .await
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Returns the sorted operation ids held for `conn_id`.
    pub async fn subscriptions_for(&self, conn_id: ConnectionId) -> Vec<String> {
        let map = self.subscriptions.read().await;
        let mut ids: Vec<String> = map
            .get(&conn_id)
            .map(|subs| subs.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

#[async_trait]
impl SubscriptionEngine for InMemorySubscriptionEngine {
    async fn add_subscription(
        &self,
        conn: &Connection,
        subscription: Subscription,
    ) -> Vec<SubscriptionError> {
        if subscription.query.trim().is_empty() {
            return vec![SubscriptionError::EmptyQuery];
        }
        let mut map = self.subscriptions.write().await;
        let subs = map.entry(conn.id()).or_default();
        if subs.contains_key(&subscription.id) {
            return vec![SubscriptionError::DuplicateId(subscription.id)];
        }
        tracing::debug!(conn = %conn.id(), op = %subscription.id, "subscription added");
        subs.insert(subscription.id.clone(), subscription);
        Vec::new()
    }

    async fn remove_subscription(&self, conn: &Connection, subscription: &Subscription) {
        let mut map = self.subscriptions.write().await;
        if let Some(subs) = map.get_mut(&conn.id()) {
            subs.remove(&subscription.id);
            if subs.is_empty() {
                map.remove(&conn.id());
            }
        }
    }

    async fn remove_subscriptions(&self, conn: &Connection) {
        let removed = self.subscriptions.write().await.remove(&conn.id());
        let count = removed.map_or(0, |subs| subs.len());
        tracing::debug!(conn = %conn.id(), count, "subscriptions removed");
    }
}
