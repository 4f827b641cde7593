use axum::{
    extract::{ws::rejection::WebSocketUpgradeRejection, Path, State, WebSocketUpgrade},
    response::Response,
};
use tracing::{info, instrument, warn};

use super::session::WatchRequest;
use crate::shared::{AppError, AppState};

/// Live-watch endpoint
///
/// GET /subscribe/{room_id}
/// The room is checked before the upgrade is looked at, so an unknown room
/// is a 404 even for a request that could never have been upgraded.
#[instrument(name = "subscribe", skip(state, ws))]
pub async fn subscribe_handler(
    Path(room_id): Path<String>,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    info!(room_id = %room_id, "Live-watch connection requested");

    let request = WatchRequest::new(
        room_id,
        state.dispatcher.registry().clone(),
        state.session_config.clone(),
        state.shutdown.clone(),
    );
    let watch = request.validate(state.room_repository.as_ref()).await?;

    let ws = ws.map_err(|rejection| {
        warn!(
            room_id = %watch.room_id(),
            error = %rejection.body_text(),
            "WebSocket upgrade rejected"
        );
        AppError::UpgradeFailed(rejection.body_text())
    })?;

    info!(room_id = %watch.room_id(), "Room verified, upgrading connection");

    Ok(ws
        .on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            watch.run(Box::new(socket)).await;
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::repository::{InMemoryRoomRepository, RoomRepository};
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/subscribe/:room_id", get(subscribe_handler))
            .with_state(state)
    }

    fn plain_get(uri: String) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_room_is_not_found_before_upgrade() {
        let state = AppStateBuilder::new().build();
        let registry = state.dispatcher.registry().clone();
        let missing = uuid::Uuid::new_v4().to_string();

        let response = app(state)
            .oneshot(plain_get(format!("/subscribe/{}", missing)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(registry.watcher_count(&missing).await, 0);
    }

    #[tokio::test]
    async fn test_malformed_room_id_is_bad_request() {
        let state = AppStateBuilder::new().build();

        let response = app(state)
            .oneshot(plain_get("/subscribe/not-a-uuid".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_existing_room_without_upgrade_headers_fails_cleanly() {
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let room = rooms.create_room("q&a").await.unwrap();
        let state = AppStateBuilder::new().with_room_repository(rooms).build();
        let registry = state.dispatcher.registry().clone();

        let response = app(state)
            .oneshot(plain_get(format!("/subscribe/{}", room.id)))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(registry.room_count().await, 0);
    }
}
