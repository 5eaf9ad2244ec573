use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::room::RoomState;
use crate::connection::Connection;
use crate::event::Event;
use crate::shared::HubError;

pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Per-broadcast delivery options
#[derive(Debug, Default)]
pub struct BroadcastOptions {
    /// Connection ids skipped during fan-out (self-echo suppression)
    pub exclude_connections: HashSet<String>,
}

/// Registry of rooms and the connections joined to them
///
/// The outer map is read-mostly; each room serializes its own joins, leaves
/// and publishes on a private mutex, so per-room event order is exactly
/// acceptance order and rooms never contend with each other.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Mutex<RoomState>>>>,
    history_capacity: usize,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(history_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            history_capacity,
        }
    }

    /// Fetches the room's state, creating it on first use
    async fn room(&self, room_id: &str) -> Arc<Mutex<RoomState>> {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(room_id) {
                return room.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                debug!(room_id = %room_id, "Creating room");
                Arc::new(Mutex::new(RoomState::new(self.history_capacity)))
            })
            .clone()
    }

    /// Registers a connection under its room, creating the room if absent
    pub async fn join(&self, connection: Connection) -> Result<(), HubError> {
        if connection.room.trim().is_empty() {
            return Err(HubError::InvalidRoom("empty room id".to_string()));
        }

        let room = self.room(&connection.room).await;
        let mut state = room.lock().await;
        info!(
            room_id = %connection.room,
            connection_id = %connection.id,
            participant_id = %connection.identity.id,
            "Connection joined room"
        );
        state.touch();
        state.connections.insert(connection.id.clone(), connection);
        Ok(())
    }

    /// Removes a connection; removing an already-removed handle is a no-op
    pub async fn leave(&self, room_id: &str, connection_id: &str) {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(room_id).cloned()
        };

        if let Some(room) = room {
            let mut state = room.lock().await;
            if state.connections.remove(connection_id).is_some() {
                info!(
                    room_id = %room_id,
                    connection_id = %connection_id,
                    remaining = state.connections.len(),
                    "Connection left room"
                );
            }
            state.touch();
        }
    }

    /// Delivers `event` to every connection joined to its room
    ///
    /// Recorded kinds are appended to the room's history first, so a
    /// reconnecting client's catch-up fetch agrees with what live
    /// subscribers saw. A connection whose push fails is dropped on the
    /// spot; it never affects the other recipients. Returns the number of
    /// connections the event was delivered to.
    pub async fn broadcast(&self, event: Event, options: BroadcastOptions) -> usize {
        let room = self.room(&event.room).await;
        let mut state = room.lock().await;
        state.touch();

        if event.kind.is_recorded() {
            state.record(event.clone());
        }

        let mut delivered = 0;
        let mut broken: Vec<String> = Vec::new();
        for (connection_id, connection) in state.connections.iter() {
            if options.exclude_connections.contains(connection_id) {
                continue;
            }
            match connection.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        room_id = %event.room,
                        connection_id = %e.connection_id,
                        "Dropping broken connection during broadcast"
                    );
                    broken.push(connection_id.clone());
                }
            }
        }
        for connection_id in broken {
            state.connections.remove(&connection_id);
        }

        debug!(
            room_id = %event.room,
            kind = %event.kind,
            delivered = delivered,
            "Event broadcast"
        );
        delivered
    }

    /// The most recent `limit` events for a room, oldest first
    pub async fn history(&self, room_id: &str, limit: usize) -> Vec<Event> {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(room_id).cloned()
        };

        match room {
            Some(room) => room.lock().await.recent(limit),
            None => Vec::new(),
        }
    }

    /// Ids of every connection in `room_id` driven by `participant_id`
    ///
    /// Used by the dispatcher to build exclusion sets for non-echoing kinds;
    /// a participant's tabs all share one participant id.
    pub async fn connection_ids_for(&self, room_id: &str, participant_id: &str) -> HashSet<String> {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(room_id).cloned()
        };

        match room {
            Some(room) => {
                let state = room.lock().await;
                state
                    .connections
                    .values()
                    .filter(|c| c.identity.id == participant_id)
                    .map(|c| c.id.clone())
                    .collect()
            }
            None => HashSet::new(),
        }
    }

    pub async fn connection_count(&self, room_id: &str) -> usize {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(room_id).cloned()
        };

        match room {
            Some(room) => room.lock().await.connections.len(),
            None => 0,
        }
    }

    /// Drops rooms with no connections once their history is empty or the
    /// grace period has passed
    ///
    /// A room with history but no connections survives until the grace
    /// period passes, so brief full-disconnects do not wipe catch-up state.
    pub async fn reap_idle(&self, grace: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::hours(24));

        let mut rooms = self.rooms.write().await;
        let mut reaped = Vec::new();
        for (room_id, room) in rooms.iter() {
            // an extra strong count is an in-flight join/leave/broadcast
            // that cloned the Arc before we took the write lock; removing
            // the room now would strand that operation in an orphaned state
            if Arc::strong_count(room) > 1 {
                continue;
            }
            let state = room.lock().await;
            if state.connections.is_empty()
                && (state.history_len() == 0 || state.last_activity < cutoff)
            {
                reaped.push(room_id.clone());
            }
        }
        for room_id in &reaped {
            info!(room_id = %room_id, "Reaping idle room");
            rooms.remove(room_id);
        }
        reaped.len()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
