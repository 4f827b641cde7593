// Live Q&A server: rooms, messages and real-time room notifications
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod event;
pub mod message;
pub mod room;
pub mod routes;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use config::Config;
pub use event::{EventKind, EventPayload, RoomEvent};
pub use routes::create_router;
pub use shared::{AppError, AppState};
pub use websockets::{BroadcastDispatcher, SessionConfig, SubscriberRegistry, Watcher};
