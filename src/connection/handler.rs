use axum::{
    extract::{Query, State},
    response::sse::{Event as SseFrame, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::manager::Connection;
use crate::event::{Event, ParticipantIdentity};
use crate::registry::RoomRegistry;
use crate::shared::{AppState, HubError};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);
const CONNECT_BACKLOG_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub room: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// Leaves the room when the client's stream is dropped
///
/// The response stream is the only owner of the connection's receive half,
/// so transport teardown of any flavor funnels through this guard. Leave is
/// idempotent; a connection already dropped by a failed broadcast push is
/// fine.
struct LeaveOnDrop {
    registry: Arc<RoomRegistry>,
    room: String,
    connection_id: String,
}

impl Drop for LeaveOnDrop {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let room = std::mem::take(&mut self.room);
        let connection_id = std::mem::take(&mut self.connection_id);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                registry.leave(&room, &connection_id).await;
            });
        }
    }
}

fn frame(event: &Event) -> Result<SseFrame, axum::Error> {
    SseFrame::default()
        .event(event.kind.as_str())
        .id(event.id.clone())
        .json_data(event)
}

/// GET /realtime/stream?room=<id>&id=<participantId>&name=<name>&role=<role>
///
/// Opens the long-lived streaming response: a synthetic `connect` frame,
/// a bounded backlog of recent room history, then live events as they are
/// broadcast. Identity is trusted as supplied; only the room id is
/// validated here.
pub async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<SseFrame, axum::Error>>>, HubError> {
    let identity = ParticipantIdentity::new(query.id, query.name, query.role);
    let (connection, receiver) = Connection::open(query.room.as_str(), identity.clone());
    let connection_id = connection.id.clone();
    let opened_at = connection.opened_at;

    state.registry.join(connection).await?;
    state.presence.heartbeat(&query.room, &identity).await;

    info!(
        room_id = %query.room,
        connection_id = %connection_id,
        participant_id = %identity.id,
        "Stream established"
    );

    let mut initial: Vec<Result<SseFrame, axum::Error>> = Vec::new();
    initial.push(SseFrame::default().event("connect").json_data(json!({
        "connectionId": connection_id,
        "room": query.room,
        "openedAt": opened_at.timestamp_millis(),
    })));
    let backlog = state
        .registry
        .history(&query.room, CONNECT_BACKLOG_LIMIT)
        .await;
    for event in &backlog {
        initial.push(frame(event));
    }

    let guard = LeaveOnDrop {
        registry: state.registry.clone(),
        room: query.room.clone(),
        connection_id,
    };

    let live = stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        receiver
            .recv()
            .await
            .map(|event| (frame(&event), (receiver, guard)))
    });

    let stream = stream::iter(initial).chain(live);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}
