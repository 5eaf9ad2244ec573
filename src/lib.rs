// Library crate for the Pulse realtime hub
// This file exposes the public API for integration tests

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod event;
pub mod presence;
pub mod registry;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use client::{LocalTransport, ReconnectPolicy, StreamClient, StreamTransport};
pub use connection::Connection;
pub use dispatch::EventDispatcher;
pub use event::{Event, EventKind, ParticipantIdentity};
pub use presence::{PresenceConfig, PresenceTracker};
pub use registry::{BroadcastOptions, RoomRegistry};
pub use shared::{AppState, HubError};
