// Event envelope and kind policy
//
// The hub only inspects `room`, `kind` and `sender` for routing and
// suppression decisions; payloads are opaque JSON blobs owned by the
// publishing collaborator.

// Public API - what other modules can use
pub use envelope::{Event, ParticipantIdentity};
pub use kinds::EventKind;

// Internal modules
mod envelope;
mod kinds;
