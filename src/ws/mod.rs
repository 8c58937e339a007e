//! WebSocket layer: negotiation, session loop, and lifecycle coordination.
//!
//! The endpoint (default `/graphql`) speaks the graphql-ws subprotocol.
//! [`handler`] negotiates and authenticates, [`coordinator`] binds
//! connection events to the registry and subscription engine, and
//! [`session`] drives one connection's frames.

pub mod coordinator;
pub mod handler;
pub mod messages;
pub mod session;

pub use coordinator::LifecycleCoordinator;
pub use handler::HandlerConfig;
