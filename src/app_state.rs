//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::ConnectionRegistry;
use crate::engine::SubscriptionEngine;
use crate::ws::coordinator::LifecycleCoordinator;
use crate::ws::handler::HandlerConfig;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Lifecycle coordinator owning the connection registry.
    pub coordinator: Arc<LifecycleCoordinator>,
    /// Handshake and session settings.
    pub handler: Arc<HandlerConfig>,
    /// Flipped to `true` to close every live session.
    pub shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Builds state around a fresh registry and the given engine.
    #[must_use]
    pub fn new(engine: Arc<dyn SubscriptionEngine>, handler: HandlerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let (shutdown, _) = watch::channel(false);
        Self {
            coordinator: Arc::new(LifecycleCoordinator::new(registry, engine)),
            handler: Arc::new(handler),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Returns the connection registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.coordinator.registry()
    }

    /// Signals every live session to close.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
