use std::sync::Arc;
use tracing::{debug, instrument};

use crate::event::{Event, EventKind, ParticipantIdentity};
use crate::presence::PresenceTracker;
use crate::registry::{BroadcastOptions, RoomRegistry};
use crate::shared::HubError;

/// Validates and normalizes publish requests, then broadcasts them
///
/// Stateless per call: the only state it touches lives in the registry and
/// the presence tracker. Unknown kinds pass through untouched so
/// collaborators can add kinds without a hub change.
pub struct EventDispatcher {
    registry: Arc<RoomRegistry>,
    presence: Arc<PresenceTracker>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<RoomRegistry>, presence: Arc<PresenceTracker>) -> Self {
        Self { registry, presence }
    }

    /// Accepts or rejects a publish; on acceptance the event is broadcast
    /// to every connection in the room, minus the sender's own connections
    /// for kinds that do not echo.
    ///
    /// Returns the accepted event. Acceptance does not wait for clients to
    /// drain their queues; fan-out is fire-and-forget past this point.
    #[instrument(skip(self, payload, sender), fields(participant_id = %sender.id))]
    pub async fn publish(
        &self,
        room: &str,
        kind: EventKind,
        payload: serde_json::Value,
        sender: ParticipantIdentity,
    ) -> Result<Event, HubError> {
        if room.trim().is_empty() {
            return Err(HubError::InvalidRoom("empty room id".to_string()));
        }
        if sender.id.is_empty() {
            return Err(HubError::PublishRejected(
                "publish requires a sender id".to_string(),
            ));
        }

        // Publishing counts as activity for the sender.
        self.presence.heartbeat(room, &sender).await;

        let exclude_connections = if kind.echoes_to_sender() {
            Default::default()
        } else {
            self.registry.connection_ids_for(room, &sender.id).await
        };

        let event = Event::new(room, kind, payload, sender);
        debug!(
            room_id = %room,
            kind = %event.kind,
            event_id = %event.id,
            excluded = exclude_connections.len(),
            "Publish accepted"
        );

        self.registry
            .broadcast(
                event.clone(),
                BroadcastOptions {
                    exclude_connections,
                },
            )
            .await;

        Ok(event)
    }
}
