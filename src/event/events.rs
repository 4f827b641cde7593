use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// The closed set of notification kinds delivered to watchers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    MessageCreated,
    ReactionAdded,
    ReactionRemoved,
    MessageAnswered,
}

/// Wire body of an event: `{"kind": "...", "value": {...}}`
///
/// Each variant carries exactly the fields of its kind and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EventPayload {
    MessageCreated { id: String, message: String },
    ReactionAdded { id: String, count: i64 },
    ReactionRemoved { id: String, count: i64 },
    MessageAnswered { id: String },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::MessageCreated { .. } => EventKind::MessageCreated,
            EventPayload::ReactionAdded { .. } => EventKind::ReactionAdded,
            EventPayload::ReactionRemoved { .. } => EventKind::ReactionRemoved,
            EventPayload::MessageAnswered { .. } => EventKind::MessageAnswered,
        }
    }
}

/// A room-scoped notification
///
/// `room_id` only addresses the dispatcher. It is not part of the serialized
/// form, which is produced from `payload` alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEvent {
    pub room_id: String,
    pub payload: EventPayload,
}

impl RoomEvent {
    pub fn new(room_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            room_id: room_id.into(),
            payload,
        }
    }

    pub fn message_created(
        room_id: impl Into<String>,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            room_id,
            EventPayload::MessageCreated {
                id: id.into(),
                message: message.into(),
            },
        )
    }

    pub fn reaction_added(room_id: impl Into<String>, id: impl Into<String>, count: i64) -> Self {
        Self::new(
            room_id,
            EventPayload::ReactionAdded {
                id: id.into(),
                count,
            },
        )
    }

    pub fn reaction_removed(
        room_id: impl Into<String>,
        id: impl Into<String>,
        count: i64,
    ) -> Self {
        Self::new(
            room_id,
            EventPayload::ReactionRemoved {
                id: id.into(),
                count,
            },
        )
    }

    pub fn message_answered(room_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(room_id, EventPayload::MessageAnswered { id: id.into() })
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Serialize the wire form delivered to watchers
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::{json, Value};
    use strum::IntoEnumIterator;

    #[rstest]
    #[case::message_created(
        RoomEvent::message_created("r1", "m1", "hi"),
        json!({"kind": "message_created", "value": {"id": "m1", "message": "hi"}})
    )]
    #[case::reaction_added(
        RoomEvent::reaction_added("r1", "m1", 3),
        json!({"kind": "reaction_added", "value": {"id": "m1", "count": 3}})
    )]
    #[case::reaction_removed(
        RoomEvent::reaction_removed("r1", "m1", 0),
        json!({"kind": "reaction_removed", "value": {"id": "m1", "count": 0}})
    )]
    #[case::message_answered(
        RoomEvent::message_answered("r1", "m1"),
        json!({"kind": "message_answered", "value": {"id": "m1"}})
    )]
    fn test_wire_shape(#[case] event: RoomEvent, #[case] expected: Value) {
        let wire: Value = serde_json::from_str(&event.to_wire().unwrap()).unwrap();
        assert_eq!(wire, expected);
    }

    #[test]
    fn test_room_is_never_serialized() {
        let event = RoomEvent::message_created("secret-room", "m1", "hi");
        let wire = event.to_wire().unwrap();

        assert!(!wire.contains("secret-room"));
        assert!(!wire.contains("room"));
    }

    #[test]
    fn test_exact_message_created_text() {
        let event = RoomEvent::message_created("r1", "m1", "hi");
        assert_eq!(
            event.to_wire().unwrap(),
            r#"{"kind":"message_created","value":{"id":"m1","message":"hi"}}"#
        );
    }

    #[test]
    fn test_kind_names_match_wire_tags() {
        let samples = [
            RoomEvent::message_created("r", "m", "x"),
            RoomEvent::reaction_added("r", "m", 1),
            RoomEvent::reaction_removed("r", "m", 1),
            RoomEvent::message_answered("r", "m"),
        ];

        for (kind, event) in EventKind::iter().zip(samples.iter()) {
            assert_eq!(event.kind(), kind);
            let wire: Value = serde_json::from_str(&event.to_wire().unwrap()).unwrap();
            assert_eq!(wire["kind"], kind.to_string());
        }
    }
}
