use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kinds::EventKind;

/// Identity of the user driving a connection or publishing an event
///
/// Supplied by the collaborator at connect/publish time and trusted as-is;
/// authentication happens in the session layer, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantIdentity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

impl ParticipantIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
        }
    }
}

/// One event as it travels from publisher to every subscribed connection
///
/// The wire shape matches the publish endpoint body: `event` carries the
/// kind and `data` the opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub room: String,
    #[serde(rename = "event")]
    pub kind: EventKind,
    #[serde(rename = "data", default)]
    pub payload: serde_json::Value,
    #[serde(rename = "user")]
    pub sender: ParticipantIdentity,
    /// Epoch millis at acceptance time
    pub timestamp: i64,
}

impl Event {
    /// Builds an accepted event with a generated id and current timestamp
    pub fn new(
        room: impl Into<String>,
        kind: EventKind,
        payload: serde_json::Value,
        sender: ParticipantIdentity,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            room: room.into(),
            kind,
            payload,
            sender,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
