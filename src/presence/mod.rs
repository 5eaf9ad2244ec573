// Heartbeat-derived presence
//
// Online/offline is never pushed; it is computed from how recently a
// participant's heartbeat was seen.

// Public API - what other modules can use
pub use handlers::{heartbeat_handler, roster_handler};
pub use sweep_task::start_sweep_task;
pub use tracker::{PresenceConfig, PresenceTracker, RosterEntry};

// Internal modules
mod handlers;
mod sweep_task;
mod tracker;
