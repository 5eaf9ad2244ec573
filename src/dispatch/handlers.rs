use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::event::{Event, EventKind, ParticipantIdentity};
use crate::shared::{AppState, HubError};

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct EmitRequest {
    pub room: String,
    #[serde(rename = "event")]
    pub kind: EventKind,
    #[serde(rename = "data", default)]
    pub data: Value,
    pub user: ParticipantIdentity,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub room: String,
    pub limit: Option<usize>,
}

/// POST /realtime/emit
///
/// Returns once the event is accepted and queued to every recipient; it
/// does not wait for clients to drain their streams.
pub async fn emit_handler(
    State(state): State<AppState>,
    Json(request): Json<EmitRequest>,
) -> Result<Json<Value>, HubError> {
    info!(
        room_id = %request.room,
        kind = %request.kind,
        participant_id = %request.user.id,
        "Publish request received"
    );

    let event = state
        .dispatcher
        .publish(&request.room, request.kind, request.data, request.user)
        .await?;

    Ok(Json(json!({ "ok": true, "id": event.id })))
}

/// GET /realtime/history?room=<id>&limit=<n>
///
/// Reconnect catch-up: the most recent events for a room, oldest first.
pub async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Event>>, HubError> {
    if query.room.trim().is_empty() {
        return Err(HubError::InvalidRoom("empty room id".to_string()));
    }

    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let history = state.registry.history(&query.room, limit).await;
    Ok(Json(history))
}
