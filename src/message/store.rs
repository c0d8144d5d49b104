//! SQLite-backed [`MessageStore`].

use async_trait::async_trait;

use super::repository::MessageRepository;
use crate::chat::{ChatError, Message, MessageStore, NewMessage, RoomId};
use crate::db::DbPool;

/// Message store over the `messages` table.
#[derive(Clone)]
pub struct SqlMessageStore {
    pool: DbPool,
}

impl SqlMessageStore {
    /// Create a store.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for SqlMessageStore {
    async fn append(&self, message: NewMessage) -> Result<Message, ChatError> {
        Ok(MessageRepository::new(&self.pool).append(&message).await?)
    }

    async fn backlog(&self, room_id: RoomId, limit: usize) -> Result<Vec<Message>, ChatError> {
        Ok(MessageRepository::new(&self.pool)
            .recent(room_id, limit)
            .await?)
    }
}
