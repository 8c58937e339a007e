//! Domain layer: connection identity, sessions, and the live registry.
//!
//! The [`ConnectionRegistry`] is the single source of truth for which
//! connections exist. A connection is a member iff its transport is open.

pub mod connection;
pub mod connection_id;
pub mod connection_registry;
pub mod events;

pub use connection::{Connection, ConnectionState, ConnectionSummary};
pub use connection_id::ConnectionId;
pub use connection_registry::ConnectionRegistry;
pub use events::ConnectionEventHandler;
