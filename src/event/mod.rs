// Room notifications
//
// Events are built by the HTTP write handlers once a write has succeeded and
// are handed to the broadcast dispatcher for fan-out to live watchers.

pub use events::{EventKind, EventPayload, RoomEvent};

mod events;
