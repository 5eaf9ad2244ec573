// Room registry: the map from room id to live connections and recent history
//
// Rooms are created lazily on first join or first publish and reaped by a
// background task once they have been empty past a grace period.

// Public API - what other modules can use
pub use reap_task::{start_reap_task, ReapConfig};
pub use registry::{BroadcastOptions, RoomRegistry, DEFAULT_HISTORY_CAPACITY};

// Internal modules
mod reap_task;
mod registry;
mod room;
