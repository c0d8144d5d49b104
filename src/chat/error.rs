//! Error taxonomy of the chat core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::HuddleError;

/// Why entry to a room was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    /// The room does not exist or is inactive.
    NotFound,
    /// The room is protected and no secret was supplied.
    SecretRequired,
    /// The supplied secret does not match.
    SecretInvalid,
    /// The room is at capacity.
    RoomFull,
    /// Too many failed secret attempts recently.
    TooManyAttempts,
}

/// Chat core errors.
///
/// Every variant maps to a stable `code()` sent to clients in `error` events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The event requires prior authentication.
    #[error("authentication required")]
    NotAuthenticated,

    /// Room or identity missing.
    #[error("{0} not found")]
    NotFound(String),

    /// Protected room entered without a secret.
    #[error("room secret required")]
    SecretRequired,

    /// Protected room entered with a wrong secret.
    #[error("room secret invalid")]
    SecretInvalid,

    /// Room at capacity.
    #[error("room is full")]
    RoomFull,

    /// Secret attempts throttled.
    #[error("too many failed attempts, retry in {retry_after_secs}s")]
    TooManyAttempts {
        /// Seconds until another attempt is accepted.
        retry_after_secs: u64,
    },

    /// The connection is already bound to a different identity.
    #[error("connection already bound to another identity")]
    AlreadyBound,

    /// The connection is not a member of the room.
    #[error("not a member of room {0}")]
    NotMember(i64),

    /// Rejected message content.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// An event could not be queued for a connection.
    #[error("delivery failed")]
    DeliveryFailure,

    /// A durable write or lookup failed.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// The connection has been closed.
    #[error("connection closed")]
    ConnectionClosed,
}

impl ChatError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::NotAuthenticated => "not_authenticated",
            ChatError::NotFound(_) => "not_found",
            ChatError::SecretRequired => "secret_required",
            ChatError::SecretInvalid => "secret_invalid",
            ChatError::RoomFull => "room_full",
            ChatError::TooManyAttempts { .. } => "too_many_attempts",
            ChatError::AlreadyBound => "already_bound",
            ChatError::NotMember(_) => "not_member",
            ChatError::InvalidMessage(_) => "invalid_message",
            ChatError::DeliveryFailure => "delivery_failure",
            ChatError::PersistenceFailure(_) => "persistence_failure",
            ChatError::ConnectionClosed => "connection_closed",
        }
    }

    /// The room-entry reason this error corresponds to, if any.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            ChatError::NotFound(_) => Some(DenyReason::NotFound),
            ChatError::SecretRequired => Some(DenyReason::SecretRequired),
            ChatError::SecretInvalid => Some(DenyReason::SecretInvalid),
            ChatError::RoomFull => Some(DenyReason::RoomFull),
            ChatError::TooManyAttempts { .. } => Some(DenyReason::TooManyAttempts),
            _ => None,
        }
    }

    /// Whether this is an infrastructure failure rather than a client error.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, ChatError::PersistenceFailure(_))
    }
}

impl From<HuddleError> for ChatError {
    fn from(err: HuddleError) -> Self {
        ChatError::PersistenceFailure(err.to_string())
    }
}
