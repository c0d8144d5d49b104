//! Request DTOs for the HTTP API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, username_chars};

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username.
    #[validate(
        length(min = 3, max = 30, message = "Username must be 3-30 characters"),
        custom(function = "username_chars")
    )]
    pub username: String,
    /// Password.
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    /// Avatar URL (optional).
    #[serde(default)]
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar_url: Option<String>,
}

/// Room secret check.
#[derive(Debug, Deserialize, Validate)]
pub struct ValidateSecretRequest {
    /// Secret to check.
    #[validate(
        length(min = 1, max = 128, message = "Password is required"),
        custom(function = "no_control_chars")
    )]
    pub password: String,
}

/// Query parameters for message history.
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    /// Page size (default 50, max 200).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Number of newest messages to skip.
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Upper bound for a history page.
pub const MAX_MESSAGES_LIMIT: usize = 200;

impl MessagesQuery {
    /// Page size clamped to `1..=MAX_MESSAGES_LIMIT`.
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_MESSAGES_LIMIT)
    }
}
