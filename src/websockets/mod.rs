// Public API
pub use dispatcher::{BroadcastDispatcher, DeliveryError, DeliveryReport};
pub use handler::subscribe_handler;
pub use registry::{SubscriberRegistry, Watcher};
pub use session::{CloseReason, SessionConfig, ValidatedWatch, WatchRequest};
pub use socket::{SocketError, SocketWrapper};

// Internal modules
mod dispatcher;
mod handler;
mod registry;
mod session;
mod socket;
