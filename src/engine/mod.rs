//! Subscription engine boundary.
//!
//! The engine owns subscription semantics: validation, execution and result
//! fan-out. The gateway only adds, removes and bulk-removes subscriptions
//! through [`SubscriptionEngine`]. [`InMemorySubscriptionEngine`] is a
//! bookkeeping-only implementation that lets the service run standalone.

pub mod memory;
pub mod subscription;

use std::fmt;

use async_trait::async_trait;

use crate::domain::Connection;

pub use memory::InMemorySubscriptionEngine;
pub use subscription::{SendDataFn, Subscription};

/// One reason an operation was rejected. Returned as data, never raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    /// The query text was empty.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The operation id is already in use on this connection.
    #[error("subscription {0} already exists")]
    DuplicateId(String),

    /// Any other engine-specific rejection.
    #[error("{0}")]
    Rejected(String),
}

impl SubscriptionError {
    /// Convenience constructor for [`SubscriptionError::Rejected`].
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Operations the gateway consumes from the subscription engine.
///
/// All methods must be safe to call concurrently for distinct connections
/// and must treat already-absent subscriptions as a no-op.
#[async_trait]
pub trait SubscriptionEngine: Send + Sync + fmt::Debug {
    /// Adds a subscription. An empty list means it was accepted.
    async fn add_subscription(
        &self,
        conn: &Connection,
        subscription: Subscription,
    ) -> Vec<SubscriptionError>;

    /// Removes the subscription with `subscription.id` on `conn`.
    async fn remove_subscription(&self, conn: &Connection, subscription: &Subscription);

    /// Removes every subscription owned by `conn`.
    async fn remove_subscriptions(&self, conn: &Connection);
}
