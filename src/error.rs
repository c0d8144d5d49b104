//! Crate-wide error type.

use thiserror::Error;

/// Errors from storage, configuration and startup.
///
/// Chat-level failures have their own taxonomy in [`crate::chat::ChatError`].
#[derive(Error, Debug)]
pub enum HuddleError {
    /// A query failed.
    #[error("database error: {0}")]
    Database(String),

    /// The pool could not be opened or migrated.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// A unique constraint rejected the write.
    #[error("{0} already exists")]
    Conflict(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lookup by id or name found nothing.
    #[error("{0} not found")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for HuddleError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                HuddleError::Conflict(db.table().unwrap_or("record").to_string())
            }
            _ => HuddleError::Database(e.to_string()),
        }
    }
}

/// Result alias over [`HuddleError`].
pub type Result<T> = std::result::Result<T, HuddleError>;
