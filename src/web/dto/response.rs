//! Response DTOs for the HTTP API.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chat::{DenyReason, Message};
use crate::room::{RoomMemberInfo, RoomSummary, RoomView};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Login and registration response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Access token expiry in seconds.
    pub expires_in: u64,
    /// User information.
    pub user: UserInfo,
}

/// User information in responses.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    /// User ID.
    pub id: i64,
    /// Username.
    pub username: String,
    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A room in the room list.
#[derive(Debug, Serialize)]
pub struct RoomListItem {
    /// Room ID.
    pub id: i64,
    /// Room name.
    pub name: String,
    /// Room description.
    pub description: Option<String>,
    /// Whether a secret is required.
    pub is_protected: bool,
    /// Room category.
    pub category: String,
    /// Maximum number of live connections.
    pub capacity: i64,
    /// Active persisted memberships.
    pub member_count: i64,
    /// Live connections present now.
    pub online_count: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl RoomListItem {
    /// Build from a summary and the live presence count.
    pub fn new(summary: RoomSummary, online_count: usize) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            description: summary.description,
            is_protected: summary.is_protected,
            category: summary.category,
            capacity: summary.max_users,
            member_count: summary.member_count,
            online_count,
            created_at: summary.created_at,
        }
    }
}

/// Room detail.
#[derive(Debug, Serialize)]
pub struct RoomDetailResponse {
    /// Room metadata.
    #[serde(flatten)]
    pub room: RoomView,
    /// Live connections present now.
    pub online_count: usize,
    /// Active persisted members.
    pub members: Vec<RoomMemberInfo>,
}

/// A page of room history.
#[derive(Debug, Serialize)]
pub struct MessagePage {
    /// Messages, oldest first.
    pub messages: Vec<Message>,
    /// Page size used.
    pub limit: usize,
    /// Offset used.
    pub offset: usize,
    /// Total visible messages in the room.
    pub total: i64,
}

/// Result of a room secret check.
#[derive(Debug, Serialize)]
pub struct AccessCheckResponse {
    /// Whether entry would be allowed.
    pub allowed: bool,
    /// Why not, when refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: &'static str,
    /// Live connections.
    pub connections: usize,
}
