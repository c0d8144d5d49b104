//! Router configuration.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    get_room, health_check, list_rooms, login, me, register, room_messages,
    validate_room_password, AppState,
};
use super::middleware::create_cors_layer;
use super::ws::chat_ws_handler;

/// Create the application router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me));

    let room_routes = Router::new()
        .route("/", get(list_rooms))
        .route("/:id", get(get_room))
        .route("/:id/messages", get(room_messages))
        .route("/:id/validate-password", post(validate_room_password));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/rooms", room_routes);

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(chat_ws_handler))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}
