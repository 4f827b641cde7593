use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for messages table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageModel {
    pub id: Uuid,
    pub room_id: Uuid,
    pub message: String,
    pub reaction_count: i64,
    pub answered: bool,
}

impl MessageModel {
    pub fn new(room_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            message: message.into(),
            reaction_count: 0,
            answered: false,
        }
    }
}
