//! # graphql-ws-gateway
//!
//! Connection lifecycle and registry coordinator for graphql-ws
//! subscription servers.
//!
//! The gateway negotiates the `graphql-ws` subprotocol, authenticates each
//! connection once at handshake time, tracks live connections in a single
//! registry, and turns the protocol's `start` / `stop` / close events into
//! calls on a pluggable subscription engine. Query validation and execution
//! belong to the engine, not to this crate.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler: negotiate + authenticate (ws/handler)
//!     ├── Session loop (ws/session)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── LifecycleCoordinator (ws/coordinator)
//!     │       │
//!     │       ├── ConnectionRegistry (domain/)
//!     │       └── SubscriptionEngine (engine/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod server;
pub mod ws;
