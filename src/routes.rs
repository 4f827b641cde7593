use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::shared::AppState;
use crate::{message, room, websockets};

/// Build the application router: the REST API plus the live-watch endpoint
pub fn create_router(app_state: AppState) -> Router {
    let api = Router::new()
        .route("/rooms", get(room::list_rooms).post(room::create_room))
        .route("/rooms/:room_id", get(room::get_room))
        .route(
            "/rooms/:room_id/messages",
            get(message::list_room_messages).post(message::create_room_message),
        )
        .route(
            "/rooms/:room_id/messages/:message_id",
            get(message::get_room_message),
        )
        .route(
            "/rooms/:room_id/messages/:message_id/react",
            patch(message::react_to_message).delete(message::remove_reaction_from_message),
        )
        .route(
            "/rooms/:room_id/messages/:message_id/answer",
            patch(message::mark_message_answered),
        );

    Router::new()
        .route("/subscribe/:room_id", get(websockets::subscribe_handler))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
