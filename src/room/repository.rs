use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::RoomModel;
use crate::shared::AppError;

/// Trait for room repository operations
#[async_trait]
pub trait RoomRepository {
    async fn create_room(&self, theme: &str) -> Result<RoomModel, AppError>;
    async fn get_room(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError>;
    async fn list_rooms(&self) -> Result<Vec<RoomModel>, AppError>;

    async fn room_exists(&self, room_id: Uuid) -> Result<bool, AppError> {
        Ok(self.get_room(room_id).await?.is_some())
    }
}

/// In-memory implementation of RoomRepository for development and testing
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<Uuid, RoomModel>>,
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self))]
    async fn create_room(&self, theme: &str) -> Result<RoomModel, AppError> {
        let room = RoomModel::new(theme);
        debug!(room_id = %room.id, "Creating room in memory");

        let mut rooms = self.rooms.lock().map_err(|_| AppError::Internal)?;
        rooms.insert(room.id, room.clone());

        Ok(room)
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError> {
        let rooms = self.rooms.lock().map_err(|_| AppError::Internal)?;
        let room = rooms.get(&room_id).cloned();

        if room.is_none() {
            debug!(room_id = %room_id, "Room not found in memory");
        }
        Ok(room)
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> Result<Vec<RoomModel>, AppError> {
        let rooms = self.rooms.lock().map_err(|_| AppError::Internal)?;
        Ok(rooms.values().cloned().collect())
    }
}

/// PostgreSQL implementation of room repository
pub struct PostgresRoomRepository {
    pool: PgPool,
}

impl PostgresRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    #[instrument(skip(self))]
    async fn create_room(&self, theme: &str) -> Result<RoomModel, AppError> {
        sqlx::query_as::<_, RoomModel>("INSERT INTO rooms (theme) VALUES ($1) RETURNING id, theme")
            .bind(theme)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to insert room");
                AppError::DatabaseError(e.to_string())
            })
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError> {
        sqlx::query_as::<_, RoomModel>("SELECT id, theme FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, room_id = %room_id, "Failed to fetch room");
                AppError::DatabaseError(e.to_string())
            })
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> Result<Vec<RoomModel>, AppError> {
        sqlx::query_as::<_, RoomModel>("SELECT id, theme FROM rooms")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to list rooms");
                AppError::DatabaseError(e.to_string())
            })
    }

    #[instrument(skip(self))]
    async fn room_exists(&self, room_id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM rooms WHERE id = $1)")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, room_id = %room_id, "Failed to check room existence");
                AppError::DatabaseError(e.to_string())
            })
    }
}
