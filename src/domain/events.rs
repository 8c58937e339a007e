//! The event contract a connection drives over its lifetime.
//!
//! A registered connection emits any interleaving of start and stop events
//! followed by exactly one close. Events for one operation id are never
//! delivered concurrently; events for distinct ids may be.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::Connection;
use crate::engine::SubscriptionError;
use crate::ws::messages::StartPayload;

/// Receiver of connection lifecycle events, injected at construction.
#[async_trait]
pub trait ConnectionEventHandler: Send + Sync + fmt::Debug {
    /// The transport is gone. Called at most once per connection.
    async fn on_close(&self, conn: &Arc<Connection>);

    /// The peer started an operation. An empty list means it was accepted.
    async fn on_start_operation(
        &self,
        conn: &Arc<Connection>,
        op_id: &str,
        payload: StartPayload,
    ) -> Vec<SubscriptionError>;

    /// The peer stopped an operation. Unknown ids are a no-op.
    async fn on_stop_operation(&self, conn: &Arc<Connection>, op_id: &str);
}
