// Validates inbound publishes and fans them out through the registry

// Public API - what other modules can use
pub use dispatcher::EventDispatcher;
pub use handlers::{emit_handler, history_handler};

// Internal modules
mod dispatcher;
mod handlers;
