//! Room directory handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::AppState;
use crate::chat::AccessDecision;
use crate::message::MessageRepository;
use crate::room::{MembershipRepository, RoomRepository, RoomView};
use crate::web::dto::{
    AccessCheckResponse, ApiResponse, HealthResponse, MessagePage, MessagesQuery,
    RoomDetailResponse, RoomListItem, ValidateSecretRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// GET /api/rooms - Active rooms with member and presence counts.
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<RoomListItem>>>, ApiError> {
    let rooms = RoomRepository::new(state.db.pool()).list_active().await?;

    let items = rooms
        .into_iter()
        .map(|summary| {
            let online = state.hub.presence_count(summary.id);
            RoomListItem::new(summary, online)
        })
        .collect();

    Ok(Json(ApiResponse::new(items)))
}

/// GET /api/rooms/:id - Room detail with active members.
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
) -> Result<Json<ApiResponse<RoomDetailResponse>>, ApiError> {
    let room = RoomRepository::new(state.db.pool())
        .get_active(room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    let members = MembershipRepository::new(state.db.pool())
        .active_members(room_id)
        .await?;

    Ok(Json(ApiResponse::new(RoomDetailResponse {
        room: RoomView::from(&room),
        online_count: state.hub.presence_count(room_id),
        members,
    })))
}

/// GET /api/rooms/:id/messages - A page of history, oldest first.
pub async fn room_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<ApiResponse<MessagePage>>, ApiError> {
    RoomRepository::new(state.db.pool())
        .get_active(room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    let repo = MessageRepository::new(state.db.pool());
    let limit = query.limit();
    let messages = repo.page(room_id, limit, query.offset).await?;
    let total = repo.count(room_id).await?;

    Ok(Json(ApiResponse::new(MessagePage {
        messages,
        limit,
        offset: query.offset,
        total,
    })))
}

/// POST /api/rooms/:id/validate-password - Check a room secret without joining.
pub async fn validate_room_password(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(room_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ValidateSecretRequest>,
) -> Result<Json<ApiResponse<AccessCheckResponse>>, ApiError> {
    let decision = state
        .hub
        .access()
        .evaluate(&identity, room_id, Some(&req.password))
        .await?;

    let response = match decision {
        AccessDecision::Allowed { .. } => AccessCheckResponse {
            allowed: true,
            reason: None,
        },
        AccessDecision::Denied { reason, .. } => AccessCheckResponse {
            allowed: false,
            reason: Some(reason),
        },
    };

    Ok(Json(ApiResponse::new(response)))
}

/// GET /health - Liveness probe.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.hub.registry().connection_count(),
    })
}
