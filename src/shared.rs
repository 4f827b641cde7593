use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::message::repository::MessageRepository;
use crate::room::repository::RoomRepository;
use crate::websockets::{BroadcastDispatcher, SessionConfig};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub room_repository: Arc<dyn RoomRepository + Send + Sync>,
    pub message_repository: Arc<dyn MessageRepository + Send + Sync>,
    pub dispatcher: BroadcastDispatcher,
    pub session_config: SessionConfig,
    /// Parent of every watch session's cancellation token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        room_repository: Arc<dyn RoomRepository + Send + Sync>,
        message_repository: Arc<dyn MessageRepository + Send + Sync>,
        dispatcher: BroadcastDispatcher,
        session_config: SessionConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            room_repository,
            message_repository,
            dispatcher,
            session_config,
            shutdown,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Upgrade failed: {0}")]
    UpgradeFailed(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::UpgradeFailed(msg) => (
                StatusCode::BAD_REQUEST,
                format!("failed to upgrade to ws connection: {}", msg),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "something went wrong".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// Parse a path id, mapping failure to a 400 with `message`
pub fn parse_id(raw: &str, message: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(message.to_string()))
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::message::repository::InMemoryMessageRepository;
    use crate::room::repository::InMemoryRoomRepository;
    use crate::websockets::SubscriberRegistry;
    use std::time::Duration;

    /// Builder for creating AppState with overrides for testing
    ///
    /// Anything not overridden gets an empty in-memory repository.
    pub struct AppStateBuilder {
        room_repository: Option<Arc<dyn RoomRepository + Send + Sync>>,
        message_repository: Option<Arc<dyn MessageRepository + Send + Sync>>,
        shutdown: CancellationToken,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                room_repository: None,
                message_repository: None,
                shutdown: CancellationToken::new(),
            }
        }

        pub fn with_room_repository(mut self, repo: Arc<dyn RoomRepository + Send + Sync>) -> Self {
            self.room_repository = Some(repo);
            self
        }

        pub fn with_message_repository(
            mut self,
            repo: Arc<dyn MessageRepository + Send + Sync>,
        ) -> Self {
            self.message_repository = Some(repo);
            self
        }

        pub fn build(self) -> AppState {
            let registry = Arc::new(SubscriberRegistry::new());
            AppState {
                room_repository: self
                    .room_repository
                    .unwrap_or_else(|| Arc::new(InMemoryRoomRepository::new())),
                message_repository: self
                    .message_repository
                    .unwrap_or_else(|| Arc::new(InMemoryMessageRepository::new())),
                dispatcher: BroadcastDispatcher::new(registry, Duration::from_millis(50)),
                session_config: SessionConfig::default(),
                shutdown: self.shutdown,
            }
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
