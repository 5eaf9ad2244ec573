use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::dispatch::EventDispatcher;
use crate::event::{Event, EventKind, ParticipantIdentity};
use crate::registry::RoomRegistry;
use crate::shared::HubError;

/// Transport used by the stream adapter to reach the hub
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Opens a streaming connection to `room`; the returned receiver yields
    /// every event delivered to that connection until it closes.
    async fn connect(
        &self,
        room: &str,
        identity: &ParticipantIdentity,
    ) -> Result<mpsc::UnboundedReceiver<Event>, HubError>;

    /// Publishes one event; resolves on acceptance, not fan-out completion
    async fn publish(
        &self,
        room: &str,
        kind: EventKind,
        payload: serde_json::Value,
        identity: &ParticipantIdentity,
    ) -> Result<(), HubError>;
}

/// In-process transport wired directly to a hub instance
pub struct LocalTransport {
    registry: Arc<RoomRegistry>,
    dispatcher: Arc<EventDispatcher>,
}

impl LocalTransport {
    pub fn new(registry: Arc<RoomRegistry>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }
}

#[async_trait]
impl StreamTransport for LocalTransport {
    async fn connect(
        &self,
        room: &str,
        identity: &ParticipantIdentity,
    ) -> Result<mpsc::UnboundedReceiver<Event>, HubError> {
        let (connection, receiver) = Connection::open(room, identity.clone());
        self.registry.join(connection).await?;
        Ok(receiver)
    }

    async fn publish(
        &self,
        room: &str,
        kind: EventKind,
        payload: serde_json::Value,
        identity: &ParticipantIdentity,
    ) -> Result<(), HubError> {
        self.dispatcher
            .publish(room, kind, payload, identity.clone())
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::{PresenceConfig, PresenceTracker};
    use serde_json::json;

    fn transport() -> LocalTransport {
        let registry = Arc::new(RoomRegistry::new());
        let presence = Arc::new(PresenceTracker::new(PresenceConfig::default()));
        let dispatcher = Arc::new(EventDispatcher::new(registry.clone(), presence));
        LocalTransport::new(registry, dispatcher)
    }

    #[tokio::test]
    async fn test_connect_then_publish_delivers() {
        let transport = transport();
        let alice = ParticipantIdentity::new("1", "Alice", "member");
        let bob = ParticipantIdentity::new("2", "Bob", "member");

        let mut receiver = transport.connect("dm:1:2", &alice).await.unwrap();
        transport
            .publish("dm:1:2", EventKind::Dm, json!({"text": "hi"}), &bob)
            .await
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::Dm);
        assert_eq!(event.sender.id, "2");
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_room() {
        let transport = transport();
        let alice = ParticipantIdentity::new("1", "Alice", "member");

        let result = transport.connect("", &alice).await;
        assert!(matches!(result, Err(HubError::InvalidRoom(_))));
    }
}
