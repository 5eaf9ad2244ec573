use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::tracker::RosterEntry;
use crate::event::ParticipantIdentity;
use crate::shared::{AppState, HubError};

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub room: String,
    pub user: ParticipantIdentity,
}

#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    pub room: String,
}

/// POST /realtime/presence
///
/// Collaborators call this on a fixed cadence (every 2 minutes) to keep a
/// participant fresh, independently of the streaming connection's own
/// keep-alive.
pub async fn heartbeat_handler(
    State(state): State<AppState>,
    Json(request): Json<HeartbeatRequest>,
) -> Result<Json<Value>, HubError> {
    if request.room.trim().is_empty() {
        return Err(HubError::InvalidRoom("empty room id".to_string()));
    }
    if request.user.id.is_empty() {
        return Err(HubError::PublishRejected(
            "heartbeat requires a participant id".to_string(),
        ));
    }

    debug!(
        room_id = %request.room,
        participant_id = %request.user.id,
        "Presence heartbeat"
    );
    state.presence.heartbeat(&request.room, &request.user).await;
    Ok(Json(json!({ "ok": true })))
}

/// GET /realtime/presence?room=<id>
pub async fn roster_handler(
    State(state): State<AppState>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<Vec<RosterEntry>>, HubError> {
    if query.room.trim().is_empty() {
        return Err(HubError::InvalidRoom("empty room id".to_string()));
    }

    let roster = state.presence.roster(&query.room).await;
    Ok(Json(roster))
}
