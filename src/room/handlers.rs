use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::types::{CreateRoomRequest, CreateRoomResponse, GetRoomResponse, ListRoomsResponse};
use crate::shared::{parse_id, AppError, AppState};

/// HTTP handler for creating a new room
///
/// POST /api/rooms
#[instrument(name = "create_room", skip(state))]
pub async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    let room = state.room_repository.create_room(&request.theme).await?;

    info!(room_id = %room.id, "Room created");

    Ok(Json(CreateRoomResponse {
        id: room.id.to_string(),
    }))
}

/// HTTP handler for listing all rooms
///
/// GET /api/rooms
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(
    State(state): State<AppState>,
) -> Result<Json<ListRoomsResponse>, AppError> {
    let rooms: Vec<_> = state
        .room_repository
        .list_rooms()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    info!(room_count = rooms.len(), "Rooms listed");

    Ok(Json(ListRoomsResponse {
        total: rooms.len(),
        rooms,
    }))
}

/// GET /api/rooms/{room_id}
#[instrument(name = "get_room", skip(state))]
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<GetRoomResponse>, AppError> {
    let room_id = parse_id(&room_id, "invalid room id")?;
    let room = state
        .room_repository
        .get_room(room_id)
        .await?
        .ok_or_else(|| AppError::NotFound("room not found".to_string()))?;

    Ok(Json(GetRoomResponse { room: room.into() }))
}
