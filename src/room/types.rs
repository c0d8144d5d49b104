//! Room and membership types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Room identifier.
pub type RoomId = i64;

/// A chat room as stored in the directory.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Room {
    /// Room ID.
    pub id: RoomId,
    /// Unique room name.
    pub name: String,
    /// Room description.
    pub description: Option<String>,
    /// Argon2 hash of the room secret (protected rooms only).
    pub password_hash: Option<String>,
    /// Whether entering requires the secret.
    pub is_protected: bool,
    /// Maximum number of live connections.
    pub max_users: i64,
    /// Room category.
    pub category: String,
    /// Inactive rooms cannot be listed or joined.
    pub is_active: bool,
    /// Creating user, if any.
    pub created_by: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Live connection capacity, never below one.
    pub fn capacity(&self) -> usize {
        self.max_users.max(1) as usize
    }
}

/// Public view of a room, without the secret hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomView {
    /// Room ID.
    pub id: RoomId,
    /// Room name.
    pub name: String,
    /// Room description.
    pub description: Option<String>,
    /// Whether a secret is required.
    pub is_protected: bool,
    /// Maximum number of live connections.
    pub capacity: i64,
    /// Room category.
    pub category: String,
}

impl From<&Room> for RoomView {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            name: room.name.clone(),
            description: room.description.clone(),
            is_protected: room.is_protected,
            capacity: room.max_users,
            category: room.category.clone(),
        }
    }
}

/// Data for creating a room.
#[derive(Debug, Clone)]
pub struct NewRoom {
    /// Room name.
    pub name: String,
    /// Room description.
    pub description: Option<String>,
    /// Room category.
    pub category: String,
    /// Maximum number of live connections.
    pub capacity: i64,
    /// Pre-hashed secret; `Some` makes the room protected.
    pub secret_hash: Option<String>,
    /// Creating user.
    pub created_by: Option<i64>,
}

impl NewRoom {
    /// Create a public room with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            category: "general".to_string(),
            capacity: 50,
            secret_hash: None,
            created_by: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the capacity.
    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Protect the room with a pre-hashed secret.
    pub fn with_secret_hash(mut self, hash: impl Into<String>) -> Self {
        self.secret_hash = Some(hash.into());
        self
    }

    /// Set the creating user.
    pub fn with_creator(mut self, user_id: i64) -> Self {
        self.created_by = Some(user_id);
        self
    }
}

/// A room listed with its persisted membership count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomSummary {
    /// Room ID.
    pub id: RoomId,
    /// Room name.
    pub name: String,
    /// Room description.
    pub description: Option<String>,
    /// Whether a secret is required.
    pub is_protected: bool,
    /// Room category.
    pub category: String,
    /// Maximum number of live connections.
    pub max_users: i64,
    /// Number of active persisted memberships.
    pub member_count: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Durable record that a user has joined a room.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Membership {
    /// Membership ID.
    pub id: i64,
    /// Member user ID.
    pub user_id: i64,
    /// Room ID.
    pub room_id: RoomId,
    /// Role within the room.
    pub role: String,
    /// Whether the membership currently grants access.
    pub is_active: bool,
    /// When the membership was last granted.
    pub joined_at: DateTime<Utc>,
    /// When the membership was last revoked.
    pub left_at: Option<DateTime<Utc>>,
}

/// An active member as listed in room details.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RoomMemberInfo {
    /// User ID.
    pub user_id: i64,
    /// Username.
    pub username: String,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// Role within the room.
    pub role: String,
    /// When the membership was granted.
    pub joined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_room_builder() {
        let room = NewRoom::new("VIP")
            .with_description("Members only")
            .with_category("private")
            .with_capacity(10)
            .with_secret_hash("$argon2id$hash")
            .with_creator(1);

        assert_eq!(room.name, "VIP");
        assert_eq!(room.description.as_deref(), Some("Members only"));
        assert_eq!(room.category, "private");
        assert_eq!(room.capacity, 10);
        assert!(room.secret_hash.is_some());
        assert_eq!(room.created_by, Some(1));
    }

    #[test]
    fn test_capacity_floor() {
        let room = Room {
            id: 1,
            name: "r".to_string(),
            description: None,
            password_hash: None,
            is_protected: false,
            max_users: 0,
            category: "general".to_string(),
            is_active: true,
            created_by: None,
            created_at: Utc::now(),
        };
        assert_eq!(room.capacity(), 1);

        let view = RoomView::from(&room);
        assert_eq!(view.name, "r");
        assert!(!view.is_protected);
    }
}
