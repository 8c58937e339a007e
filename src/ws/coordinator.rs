//! Connection lifecycle coordinator.
//!
//! Binds each connection's events to the [`ConnectionRegistry`] and the
//! [`SubscriptionEngine`]:
//!
//! - start → build a [`Subscription`] and hand it to the engine; the engine's
//!   error list is the only result.
//! - stop → remove the subscription identified by `(connection, id)`.
//! - close → bulk-remove the connection's subscriptions, **then** drop it from
//!   the registry. Registry removal is the commit point: once a connection is
//!   absent from the registry, everything it owned is already gone.
//!
//! The registry lock is never held while the engine is called.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Connection, ConnectionEventHandler, ConnectionRegistry};
use crate::engine::{Subscription, SubscriptionEngine, SubscriptionError};
use crate::ws::messages::StartPayload;

/// Routes connection events to the registry and subscription engine.
#[derive(Debug, Clone)]
pub struct LifecycleCoordinator {
    registry: Arc<ConnectionRegistry>,
    engine: Arc<dyn SubscriptionEngine>,
}

impl LifecycleCoordinator {
    /// Creates a coordinator over the given registry and engine.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, engine: Arc<dyn SubscriptionEngine>) -> Self {
        Self { registry, engine }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Returns the subscription engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn SubscriptionEngine> {
        &self.engine
    }

    /// Registers a freshly constructed connection and marks it active.
    pub async fn register(&self, conn: &Arc<Connection>) {
        self.registry.add(Arc::clone(conn)).await;
        conn.mark_active();
        tracing::debug!(conn = %conn.id(), user = ?conn.principal(), "connection registered");
    }
}

#[async_trait]
impl ConnectionEventHandler for LifecycleCoordinator {
    async fn on_close(&self, conn: &Arc<Connection>) {
        tracing::debug!(conn = %conn.id(), user = ?conn.principal(), "closing connection");

        self.engine.remove_subscriptions(conn).await;
        self.registry.remove(conn.id()).await;
    }

    async fn on_start_operation(
        &self,
        conn: &Arc<Connection>,
        op_id: &str,
        payload: StartPayload,
    ) -> Vec<SubscriptionError> {
        tracing::debug!(conn = %conn.id(), op = op_id, user = ?conn.principal(), "start operation");

        let subscription = Subscription::new(conn, op_id, payload);
        self.engine.add_subscription(conn, subscription).await
    }

    async fn on_stop_operation(&self, conn: &Arc<Connection>, op_id: &str) {
        tracing::debug!(conn = %conn.id(), op = op_id, "stop operation");

        let subscription = Subscription::for_removal(conn, op_id);
        self.engine.remove_subscription(conn, &subscription).await;
    }
}
