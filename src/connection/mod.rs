// One long-lived streaming connection per client
//
// A connection is bound to exactly one room for its whole life. The handle
// lives in the room registry; the receive half drives the client's SSE
// response.

// Public API - what other modules can use
pub use handler::stream_handler;
pub use manager::{Connection, SendError};

// Internal modules
mod handler;
mod manager;
