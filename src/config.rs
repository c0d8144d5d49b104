//! Configuration module for Huddle.

use serde::Deserialize;
use std::path::Path;

use crate::{HuddleError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/huddle.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty disables file logging.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/huddle.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Credential configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT signing secret (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,
}

fn default_token_expiry() -> u64 {
    86400 // 24 hours
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_secs: default_token_expiry(),
        }
    }
}

/// What happens to persisted room membership when a connection drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisconnectPolicy {
    /// Only clear live session state; reconnecting restores access.
    #[default]
    Keep,
    /// Also deactivate the persisted membership of every joined room.
    Revoke,
}

/// Chat core configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Number of recent messages sent to a newly joined connection.
    #[serde(default = "default_backlog_limit")]
    pub backlog_limit: usize,
    /// Maximum message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Outgoing event buffer per connection.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
    /// Membership handling on transport close.
    #[serde(default)]
    pub disconnect_policy: DisconnectPolicy,
    /// Failed secret attempts allowed per identity and room within the window (0 = unlimited).
    #[serde(default = "default_secret_attempt_limit")]
    pub secret_attempt_limit: u32,
    /// Window for counting failed secret attempts, in seconds.
    #[serde(default = "default_secret_attempt_window")]
    pub secret_attempt_window_secs: u64,
}

fn default_backlog_limit() -> usize {
    50
}

fn default_max_message_length() -> usize {
    2000
}

fn default_outbox_capacity() -> usize {
    256
}

fn default_secret_attempt_limit() -> u32 {
    5
}

fn default_secret_attempt_window() -> u64 {
    60
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            backlog_limit: default_backlog_limit(),
            max_message_length: default_max_message_length(),
            outbox_capacity: default_outbox_capacity(),
            disconnect_policy: DisconnectPolicy::default(),
            secret_attempt_limit: default_secret_attempt_limit(),
            secret_attempt_window_secs: default_secret_attempt_window(),
        }
    }
}

/// A room created at startup if missing.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomSeed {
    /// Room name (unique).
    pub name: String,
    /// Room description.
    #[serde(default)]
    pub description: Option<String>,
    /// Room category.
    #[serde(default = "default_category")]
    pub category: String,
    /// Maximum number of live connections.
    #[serde(default = "default_capacity")]
    pub capacity: i64,
    /// Plain-text secret; the room is protected when set.
    #[serde(default)]
    pub secret: Option<String>,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_capacity() -> i64 {
    50
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Credential configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Chat core configuration.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Rooms to seed.
    #[serde(default)]
    pub rooms: Vec<RoomSeed>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(HuddleError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| HuddleError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - `HUDDLE_JWT_SECRET`: Override the JWT secret key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("HUDDLE_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(HuddleError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via HUDDLE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.chat.max_message_length == 0 || self.chat.outbox_capacity == 0 {
            return Err(HuddleError::Config(
                "chat.max_message_length and chat.outbox_capacity must be positive".to_string(),
            ));
        }
        if let Some(room) = self.rooms.iter().find(|r| r.capacity < 1) {
            return Err(HuddleError::Config(format!(
                "room '{}' must have a capacity of at least 1",
                room.name
            )));
        }
        Ok(())
    }
}
