use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::event::ParticipantIdentity;

/// Configuration for presence windows
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// A participant is online while their last heartbeat is within this window.
    /// The collaborator layer heartbeats every 2 minutes.
    pub online_window: Duration,
    /// Entries older than this are evicted from the roster entirely
    pub stale_window: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            online_window: Duration::from_secs(5 * 60),
            stale_window: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct PresenceEntry {
    identity: ParticipantIdentity,
    last_seen: DateTime<Utc>,
}

/// One roster row as reported to collaborators
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub participant: ParticipantIdentity,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

/// Tracks last-activity per participant per room
pub struct PresenceTracker {
    rooms: RwLock<HashMap<String, HashMap<String, PresenceEntry>>>,
    config: PresenceConfig,
}

impl PresenceTracker {
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Records or refreshes a participant's last-activity timestamp
    ///
    /// Monotonic per participant per room: an out-of-order refresh never
    /// moves `last_seen` backward.
    pub async fn heartbeat(&self, room_id: &str, identity: &ParticipantIdentity) {
        if identity.id.is_empty() {
            return;
        }

        let now = Utc::now();
        let mut rooms = self.rooms.write().await;
        let roster = rooms.entry(room_id.to_string()).or_default();
        roster
            .entry(identity.id.clone())
            .and_modify(|entry| {
                entry.identity = identity.clone();
                if now > entry.last_seen {
                    entry.last_seen = now;
                }
            })
            .or_insert_with(|| {
                debug!(
                    room_id = %room_id,
                    participant_id = %identity.id,
                    "First heartbeat for participant"
                );
                PresenceEntry {
                    identity: identity.clone(),
                    last_seen: now,
                }
            });
    }

    /// True iff the participant heartbeated within the online window
    pub async fn is_online(&self, room_id: &str, participant_id: &str) -> bool {
        let rooms = self.rooms.read().await;
        let Some(entry) = rooms.get(room_id).and_then(|r| r.get(participant_id)) else {
            return false;
        };
        Self::within(entry.last_seen, self.config.online_window)
    }

    /// Every known participant for a room with derived online state,
    /// sorted by participant id for stable output
    pub async fn roster(&self, room_id: &str) -> Vec<RosterEntry> {
        let rooms = self.rooms.read().await;
        let mut entries: Vec<RosterEntry> = rooms
            .get(room_id)
            .map(|roster| {
                roster
                    .values()
                    .map(|entry| RosterEntry {
                        participant: entry.identity.clone(),
                        is_online: Self::within(entry.last_seen, self.config.online_window),
                        last_seen: entry.last_seen,
                    })
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by(|a, b| a.participant.id.cmp(&b.participant.id));
        entries
    }

    /// Evicts participants whose last activity exceeds the stale window
    /// and drops rosters that end up empty. Returns the eviction count.
    pub async fn sweep(&self) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.stale_window)
                .unwrap_or_else(|_| chrono::Duration::hours(24));

        let mut rooms = self.rooms.write().await;
        let mut evicted = 0;
        rooms.retain(|room_id, roster| {
            let before = roster.len();
            roster.retain(|_, entry| entry.last_seen >= cutoff);
            let dropped = before - roster.len();
            if dropped > 0 {
                info!(room_id = %room_id, evicted = dropped, "Swept stale presence entries");
                evicted += dropped;
            }
            !roster.is_empty()
        });
        evicted
    }

    fn within(last_seen: DateTime<Utc>, window: Duration) -> bool {
        let age = Utc::now().signed_duration_since(last_seen);
        age <= chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::hours(24))
    }
}
