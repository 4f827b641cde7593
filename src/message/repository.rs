use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::MessageModel;
use crate::shared::AppError;

/// Trait for message repository operations
///
/// The reaction and answer operations return `NotFound` for unknown ids.
#[async_trait]
pub trait MessageRepository {
    async fn insert_message(&self, room_id: Uuid, message: &str) -> Result<MessageModel, AppError>;
    async fn get_message(&self, message_id: Uuid) -> Result<Option<MessageModel>, AppError>;
    async fn list_room_messages(&self, room_id: Uuid) -> Result<Vec<MessageModel>, AppError>;

    /// Increments the reaction count, returning the new count
    async fn react_to_message(&self, message_id: Uuid) -> Result<i64, AppError>;

    /// Decrements the reaction count (never below zero), returning the new count
    async fn remove_reaction(&self, message_id: Uuid) -> Result<i64, AppError>;

    async fn mark_answered(&self, message_id: Uuid) -> Result<(), AppError>;
}

fn message_not_found() -> AppError {
    AppError::NotFound("message not found".to_string())
}

/// In-memory implementation of MessageRepository for development and testing
pub struct InMemoryMessageRepository {
    messages: Mutex<HashMap<Uuid, MessageModel>>,
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
        }
    }

    fn update<T>(
        &self,
        message_id: Uuid,
        apply: impl FnOnce(&mut MessageModel) -> T,
    ) -> Result<T, AppError> {
        let mut messages = self.messages.lock().map_err(|_| AppError::Internal)?;
        let message = messages.get_mut(&message_id).ok_or_else(message_not_found)?;
        Ok(apply(message))
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    #[instrument(skip(self, message))]
    async fn insert_message(&self, room_id: Uuid, message: &str) -> Result<MessageModel, AppError> {
        let model = MessageModel::new(room_id, message);
        debug!(message_id = %model.id, "Inserting message in memory");

        let mut messages = self.messages.lock().map_err(|_| AppError::Internal)?;
        messages.insert(model.id, model.clone());
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn get_message(&self, message_id: Uuid) -> Result<Option<MessageModel>, AppError> {
        let messages = self.messages.lock().map_err(|_| AppError::Internal)?;
        Ok(messages.get(&message_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_room_messages(&self, room_id: Uuid) -> Result<Vec<MessageModel>, AppError> {
        let messages = self.messages.lock().map_err(|_| AppError::Internal)?;
        Ok(messages
            .values()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn react_to_message(&self, message_id: Uuid) -> Result<i64, AppError> {
        self.update(message_id, |m| {
            m.reaction_count += 1;
            m.reaction_count
        })
    }

    #[instrument(skip(self))]
    async fn remove_reaction(&self, message_id: Uuid) -> Result<i64, AppError> {
        self.update(message_id, |m| {
            m.reaction_count = (m.reaction_count - 1).max(0);
            m.reaction_count
        })
    }

    #[instrument(skip(self))]
    async fn mark_answered(&self, message_id: Uuid) -> Result<(), AppError> {
        self.update(message_id, |m| m.answered = true)
    }
}

/// PostgreSQL implementation of message repository
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn database_error(e: sqlx::Error) -> AppError {
    warn!(error = %e, "Message query failed");
    AppError::DatabaseError(e.to_string())
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    #[instrument(skip(self, message))]
    async fn insert_message(&self, room_id: Uuid, message: &str) -> Result<MessageModel, AppError> {
        sqlx::query_as::<_, MessageModel>(
            "INSERT INTO messages (room_id, message) VALUES ($1, $2) \
             RETURNING id, room_id, message, reaction_count, answered",
        )
        .bind(room_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)
    }

    #[instrument(skip(self))]
    async fn get_message(&self, message_id: Uuid) -> Result<Option<MessageModel>, AppError> {
        sqlx::query_as::<_, MessageModel>(
            "SELECT id, room_id, message, reaction_count, answered FROM messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)
    }

    #[instrument(skip(self))]
    async fn list_room_messages(&self, room_id: Uuid) -> Result<Vec<MessageModel>, AppError> {
        sqlx::query_as::<_, MessageModel>(
            "SELECT id, room_id, message, reaction_count, answered FROM messages \
             WHERE room_id = $1",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)
    }

    #[instrument(skip(self))]
    async fn react_to_message(&self, message_id: Uuid) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE messages SET reaction_count = reaction_count + 1 WHERE id = $1 \
             RETURNING reaction_count",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?
        .ok_or_else(message_not_found)
    }

    #[instrument(skip(self))]
    async fn remove_reaction(&self, message_id: Uuid) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE messages SET reaction_count = GREATEST(reaction_count - 1, 0) WHERE id = $1 \
             RETURNING reaction_count",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?
        .ok_or_else(message_not_found)
    }

    #[instrument(skip(self))]
    async fn mark_answered(&self, message_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE messages SET answered = true WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(message_not_found());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_list_by_room() {
        let repo = InMemoryMessageRepository::new();
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();

        let first = repo.insert_message(room_a, "why borrowck?").await.unwrap();
        repo.insert_message(room_b, "elsewhere").await.unwrap();

        let listed = repo.list_room_messages(room_a).await.unwrap();
        assert_eq!(listed, vec![first.clone()]);
        assert_eq!(first.reaction_count, 0);
        assert!(!first.answered);
    }

    #[tokio::test]
    async fn test_reactions_never_go_negative() {
        let repo = InMemoryMessageRepository::new();
        let message = repo.insert_message(Uuid::new_v4(), "q").await.unwrap();

        assert_eq!(repo.react_to_message(message.id).await.unwrap(), 1);
        assert_eq!(repo.react_to_message(message.id).await.unwrap(), 2);
        assert_eq!(repo.remove_reaction(message.id).await.unwrap(), 1);
        assert_eq!(repo.remove_reaction(message.id).await.unwrap(), 0);
        assert_eq!(repo.remove_reaction(message.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_answered() {
        let repo = InMemoryMessageRepository::new();
        let message = repo.insert_message(Uuid::new_v4(), "q").await.unwrap();

        repo.mark_answered(message.id).await.unwrap();

        let stored = repo.get_message(message.id).await.unwrap().unwrap();
        assert!(stored.answered);
    }

    #[tokio::test]
    async fn test_unknown_message_is_not_found() {
        let repo = InMemoryMessageRepository::new();
        let missing = Uuid::new_v4();

        assert!(matches!(
            repo.react_to_message(missing).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.remove_reaction(missing).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.mark_answered(missing).await,
            Err(AppError::NotFound(_))
        ));
    }
}
