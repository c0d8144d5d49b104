//! Collaborators the chat core calls into for durable state.

use async_trait::async_trait;

use super::error::ChatError;
use super::message::{Message, NewMessage};
use super::types::RoomId;
use crate::room::{Membership, Room};

/// Room metadata and persisted memberships.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Look up an active room.
    async fn room(&self, room_id: RoomId) -> Result<Option<Room>, ChatError>;

    /// Look up the membership record of a user in a room.
    async fn membership(&self, user_id: i64, room_id: RoomId)
        -> Result<Option<Membership>, ChatError>;

    /// Record that a user has joined a room.
    async fn grant_membership(&self, user_id: i64, room_id: RoomId)
        -> Result<Membership, ChatError>;

    /// Deactivate a user's membership. Returns whether one was active.
    async fn revoke_membership(&self, user_id: i64, room_id: RoomId) -> Result<bool, ChatError>;
}

/// Durable message storage.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message and return it with its assigned ID and timestamp.
    async fn append(&self, message: NewMessage) -> Result<Message, ChatError>;

    /// The most recent `limit` messages of a room, oldest first.
    async fn backlog(&self, room_id: RoomId, limit: usize) -> Result<Vec<Message>, ChatError>;
}
