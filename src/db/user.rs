//! User model for Huddle.

use chrono::{DateTime, Utc};

/// A registered user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login name, also shown to other room members.
    pub username: String,
    /// Password hash (Argon2).
    pub password: String,
    /// Avatar image URL (optional).
    pub avatar_url: Option<String>,
    /// Whether the account is active.
    pub is_active: bool,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last successful login.
    pub last_seen: Option<DateTime<Utc>>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password: String,
    /// Avatar image URL (optional).
    pub avatar_url: Option<String>,
}

impl NewUser {
    /// Create a new user with the required fields.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            avatar_url: None,
        }
    }

    /// Set the avatar URL.
    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}
