use serde::{Deserialize, Serialize};

use super::models::MessageModel;

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMessageResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub id: String,
    pub room_id: String,
    pub message: String,
    pub reactions_count: i64,
    pub answered: bool,
}

impl From<MessageModel> for MessageResponse {
    fn from(message: MessageModel) -> Self {
        Self {
            id: message.id.to_string(),
            room_id: message.room_id.to_string(),
            message: message.message,
            reactions_count: message.reaction_count,
            answered: message.answered,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<MessageResponse>,
    pub room_id: String,
    pub total: usize,
}

/// Response for reaction changes
#[derive(Debug, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub message_id: String,
    pub reactions_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnsweredResponse {
    pub message_id: String,
}
