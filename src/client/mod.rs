// Consumer-side stream adapter
//
// One shared transport connection per room, reference counted across
// subscriptions. The transport itself is a trait seam: the in-process
// implementation wires straight into a registry + dispatcher pair, a
// network implementation would speak the SSE/emit endpoints.

// Public API - what other modules can use
pub use adapter::{StreamClient, Subscription};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use reconnect::ReconnectPolicy;
pub use transport::{LocalTransport, StreamTransport};

// Internal modules
mod adapter;
mod debounce;
mod reconnect;
mod transport;
