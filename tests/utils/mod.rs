//! Shared test infrastructure for hub workflow tests
#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use pulse::{
    client::{LocalTransport, StreamTransport},
    connection::Connection,
    dispatch::EventDispatcher,
    event::{Event, EventKind, ParticipantIdentity},
    presence::{PresenceConfig, PresenceTracker},
    registry::RoomRegistry,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestHub {
    pub registry: Arc<RoomRegistry>,
    pub presence: Arc<PresenceTracker>,
    pub dispatcher: Arc<EventDispatcher>,
}

pub struct TestHubBuilder {
    history_capacity: usize,
    presence_config: PresenceConfig,
}

impl TestHubBuilder {
    pub fn new() -> Self {
        Self {
            history_capacity: 200,
            presence_config: PresenceConfig::default(),
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_presence_windows(mut self, online: Duration, stale: Duration) -> Self {
        self.presence_config = PresenceConfig {
            online_window: online,
            stale_window: stale,
        };
        self
    }

    pub fn build(self) -> TestHub {
        let registry = Arc::new(RoomRegistry::with_history_capacity(self.history_capacity));
        let presence = Arc::new(PresenceTracker::new(self.presence_config));
        let dispatcher = Arc::new(EventDispatcher::new(registry.clone(), presence.clone()));
        TestHub {
            registry,
            presence,
            dispatcher,
        }
    }
}

impl TestHub {
    /// Joins a connection for `participant_id` and returns its id plus the
    /// receive half that plays the role of the client's stream
    pub async fn connect(
        &self,
        room: &str,
        participant_id: &str,
    ) -> (String, mpsc::UnboundedReceiver<Event>) {
        let (connection, receiver) = Connection::open(room, identity(participant_id));
        let connection_id = connection.id.clone();
        self.registry.join(connection).await.unwrap();
        (connection_id, receiver)
    }

    pub async fn publish(
        &self,
        room: &str,
        kind: EventKind,
        payload: serde_json::Value,
        sender_id: &str,
    ) -> Event {
        self.dispatcher
            .publish(room, kind, payload, identity(sender_id))
            .await
            .unwrap()
    }

    pub fn local_transport(&self) -> Arc<dyn StreamTransport> {
        Arc::new(LocalTransport::new(
            self.registry.clone(),
            self.dispatcher.clone(),
        ))
    }
}

pub fn identity(id: &str) -> ParticipantIdentity {
    ParticipantIdentity::new(id, format!("user-{id}"), "member")
}

/// Receives the next event or panics after a bounded wait
pub async fn recv_within(receiver: &mut mpsc::UnboundedReceiver<Event>, ms: u64) -> Event {
    timeout(Duration::from_millis(ms), receiver.recv())
        .await
        .expect("timed out waiting for event")
        .expect("stream closed while waiting for event")
}

/// Asserts that nothing is queued on the receiver right now
pub fn assert_no_pending(receiver: &mut mpsc::UnboundedReceiver<Event>) {
    assert!(
        receiver.try_recv().is_err(),
        "expected no pending events on this connection"
    );
}
