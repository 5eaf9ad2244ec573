use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

use super::transport::StreamTransport;
use crate::event::{EventKind, ParticipantIdentity};

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Per-key publish coalescing for high-frequency kinds
///
/// One pending slot and one flush timer per (room, kind) pair. Calls
/// landing inside an open window replace the pending payload; when the
/// window elapses exactly one publish goes out carrying the latest value,
/// so the final state is never dropped.
pub struct Debouncer {
    window: Duration,
    slots: Arc<Mutex<HashMap<(String, EventKind), serde_json::Value>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Coalesces `payload` into the pending slot, arming the flush timer
    /// if this is the first call of the window. Never blocks the caller.
    pub fn publish(
        &self,
        transport: Arc<dyn StreamTransport>,
        identity: ParticipantIdentity,
        room: &str,
        kind: EventKind,
        payload: serde_json::Value,
    ) {
        let key = (room.to_string(), kind);

        {
            let mut slots = self.slots.lock().unwrap();
            if let Some(slot) = slots.get_mut(&key) {
                // timer already armed, just keep the newest payload
                *slot = payload;
                return;
            }
            slots.insert(key.clone(), payload);
        }

        let window = self.window;
        let slots = self.slots.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let taken = slots.lock().unwrap().remove(&key);
            if let Some(payload) = taken {
                let (room, kind) = key;
                if let Err(e) = transport.publish(&room, kind, payload, &identity).await {
                    warn!(room_id = %room, error = %e, "Debounced publish failed");
                }
            }
        });
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}
