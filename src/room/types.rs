use serde::{Deserialize, Serialize};

use super::models::RoomModel;

/// Request payload for creating a new room
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub theme: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomResponse {
    pub id: String,
    pub theme: String,
}

impl From<RoomModel> for RoomResponse {
    fn from(room: RoomModel) -> Self {
        Self {
            id: room.id.to_string(),
            theme: room.theme,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListRoomsResponse {
    pub rooms: Vec<RoomResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetRoomResponse {
    pub room: RoomResponse,
}
