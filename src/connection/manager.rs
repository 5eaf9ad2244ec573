use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::event::{Event, ParticipantIdentity};

/// The client behind this connection is gone
#[derive(Error, Debug)]
#[error("connection {connection_id} is closed")]
pub struct SendError {
    pub connection_id: String,
}

/// Handle for one live stream to one client
///
/// Owned by the room registry once joined. The outbound queue is unbounded:
/// pushes never block the broadcast loop, and a push to a disconnected
/// client fails immediately so the registry can drop the handle.
#[derive(Debug)]
pub struct Connection {
    pub id: String,
    pub room: String,
    pub identity: ParticipantIdentity,
    pub opened_at: DateTime<Utc>,
    outbound: mpsc::UnboundedSender<Event>,
}

impl Connection {
    /// Allocates a connection bound to `room` and returns the handle
    /// together with the receive half that feeds the client's stream.
    pub fn open(
        room: impl Into<String>,
        identity: ParticipantIdentity,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let connection = Self {
            id: Uuid::new_v4().to_string(),
            room: room.into(),
            identity,
            opened_at: Utc::now(),
            outbound,
        };
        (connection, receiver)
    }

    /// Pushes one event onto the outbound queue
    ///
    /// Best-effort and isolated: failure means this client disconnected and
    /// the caller should remove the handle, never that the broadcast failed.
    pub fn send(&self, event: Event) -> Result<(), SendError> {
        self.outbound.send(event).map_err(|_| SendError {
            connection_id: self.id.clone(),
        })
    }
}
