use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    models::MessageModel,
    types::{
        AnsweredResponse, CreateMessageRequest, CreateMessageResponse, ListMessagesResponse,
        MessageResponse, ReactionResponse,
    },
};
use crate::event::RoomEvent;
use crate::shared::{parse_id, AppError, AppState};

async fn require_room(state: &AppState, raw_room_id: &str) -> Result<Uuid, AppError> {
    let room_id = parse_id(raw_room_id, "invalid room id")?;
    if !state.room_repository.room_exists(room_id).await? {
        return Err(AppError::NotFound("room not found".to_string()));
    }
    Ok(room_id)
}

/// Loads a message that must belong to the room in the path
async fn require_message(
    state: &AppState,
    raw_room_id: &str,
    raw_message_id: &str,
) -> Result<MessageModel, AppError> {
    let room_id = parse_id(raw_room_id, "invalid room id")?;
    let message_id = parse_id(raw_message_id, "invalid message id")?;

    state
        .message_repository
        .get_message(message_id)
        .await?
        .filter(|message| message.room_id == room_id)
        .ok_or_else(|| AppError::NotFound("message not found".to_string()))
}

/// POST /api/rooms/{room_id}/messages
///
/// Emits `message_created` once the message is stored.
#[instrument(name = "create_room_message", skip(state, request))]
pub async fn create_room_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<CreateMessageRequest>,
) -> Result<Json<CreateMessageResponse>, AppError> {
    let room_id = require_room(&state, &room_id).await?;
    let message = state
        .message_repository
        .insert_message(room_id, &request.message)
        .await?;

    info!(room_id = %room_id, message_id = %message.id, "Message created");

    let response = CreateMessageResponse {
        id: message.id.to_string(),
    };
    state.dispatcher.publish(RoomEvent::message_created(
        room_id.to_string(),
        message.id.to_string(),
        message.message,
    ));

    Ok(Json(response))
}

/// GET /api/rooms/{room_id}/messages
#[instrument(name = "list_room_messages", skip(state))]
pub async fn list_room_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<ListMessagesResponse>, AppError> {
    let room_id = require_room(&state, &room_id).await?;
    let messages: Vec<MessageResponse> = state
        .message_repository
        .list_room_messages(room_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(ListMessagesResponse {
        total: messages.len(),
        messages,
        room_id: room_id.to_string(),
    }))
}

/// GET /api/rooms/{room_id}/messages/{message_id}
#[instrument(name = "get_room_message", skip(state))]
pub async fn get_room_message(
    State(state): State<AppState>,
    Path((room_id, message_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = require_message(&state, &room_id, &message_id).await?;
    Ok(Json(message.into()))
}

/// PATCH /api/rooms/{room_id}/messages/{message_id}/react
#[instrument(name = "react_to_message", skip(state))]
pub async fn react_to_message(
    State(state): State<AppState>,
    Path((room_id, message_id)): Path<(String, String)>,
) -> Result<Json<ReactionResponse>, AppError> {
    let message = require_message(&state, &room_id, &message_id).await?;
    let count = state
        .message_repository
        .react_to_message(message.id)
        .await?;

    info!(message_id = %message.id, count, "Reaction added");

    state.dispatcher.publish(RoomEvent::reaction_added(
        message.room_id.to_string(),
        message.id.to_string(),
        count,
    ));

    Ok(Json(ReactionResponse {
        message_id: message.id.to_string(),
        reactions_count: count,
    }))
}

/// DELETE /api/rooms/{room_id}/messages/{message_id}/react
#[instrument(name = "remove_reaction_from_message", skip(state))]
pub async fn remove_reaction_from_message(
    State(state): State<AppState>,
    Path((room_id, message_id)): Path<(String, String)>,
) -> Result<Json<ReactionResponse>, AppError> {
    let message = require_message(&state, &room_id, &message_id).await?;
    let count = state.message_repository.remove_reaction(message.id).await?;

    info!(message_id = %message.id, count, "Reaction removed");

    state.dispatcher.publish(RoomEvent::reaction_removed(
        message.room_id.to_string(),
        message.id.to_string(),
        count,
    ));

    Ok(Json(ReactionResponse {
        message_id: message.id.to_string(),
        reactions_count: count,
    }))
}

/// PATCH /api/rooms/{room_id}/messages/{message_id}/answer
#[instrument(name = "mark_message_answered", skip(state))]
pub async fn mark_message_answered(
    State(state): State<AppState>,
    Path((room_id, message_id)): Path<(String, String)>,
) -> Result<Json<AnsweredResponse>, AppError> {
    let message = require_message(&state, &room_id, &message_id).await?;
    state.message_repository.mark_answered(message.id).await?;

    info!(message_id = %message.id, "Message marked as answered");

    state.dispatcher.publish(RoomEvent::message_answered(
        message.room_id.to_string(),
        message.id.to_string(),
    ));

    Ok(Json(AnsweredResponse {
        message_id: message.id.to_string(),
    }))
}
