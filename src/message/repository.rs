//! Message storage.

use chrono::{DateTime, Utc};

use crate::chat::{Identity, Message, MessageKind, NewMessage, RoomId};
use crate::db::DbPool;
use crate::Result;

/// Database row type for Message.
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    room_id: i64,
    user_id: i64,
    author_name: String,
    content: String,
    message_type: String,
    file_url: Option<String>,
    file_size: Option<i64>,
    link_provider: Option<String>,
    link_video_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id,
            author: Identity::new(row.user_id, row.author_name),
            body: row.content,
            kind: MessageKind::from_columns(
                &row.message_type,
                row.file_url,
                row.file_size,
                row.link_provider,
                row.link_video_id,
            ),
            created_at: row.created_at,
        }
    }
}

/// Repository for chat messages.
pub struct MessageRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> MessageRepository<'a> {
    /// Create a new MessageRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Persist a message.
    pub async fn append(&self, message: &NewMessage) -> Result<Message> {
        let (file_url, file_size, link_provider, link_video_id) = match &message.kind {
            MessageKind::Image { url, size } => (Some(url.as_str()), *size, None, None),
            MessageKind::Link { provider, video_id } => {
                (None, None, Some(provider.as_str()), Some(video_id.as_str()))
            }
            MessageKind::Text | MessageKind::System => (None, None, None, None),
        };
        let created_at = Utc::now();

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO messages (room_id, user_id, author_name, content, message_type,
                                   file_url, file_size, link_provider, link_video_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(message.room_id)
        .bind(message.author.id)
        .bind(&message.author.display_name)
        .bind(&message.body)
        .bind(message.kind.as_str())
        .bind(file_url)
        .bind(file_size)
        .bind(link_provider)
        .bind(link_video_id)
        .bind(created_at)
        .fetch_one(self.pool)
        .await?;

        Ok(Message {
            id,
            room_id: message.room_id,
            author: message.author.clone(),
            body: message.body.clone(),
            kind: message.kind.clone(),
            created_at,
        })
    }

    /// A page of a room's history, oldest first.
    ///
    /// `offset` counts back from the newest message, so offset 0 returns the
    /// most recent `limit` messages.
    pub async fn page(&self, room_id: RoomId, limit: usize, offset: usize) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM (
                 SELECT id, room_id, user_id, author_name, content, message_type,
                        file_url, file_size, link_provider, link_video_id, created_at
                 FROM messages
                 WHERE room_id = ? AND is_deleted = 0
                 ORDER BY id DESC
                 LIMIT ? OFFSET ?
             ) ORDER BY id ASC",
        )
        .bind(room_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    /// The most recent `limit` messages of a room, oldest first.
    pub async fn recent(&self, room_id: RoomId, limit: usize) -> Result<Vec<Message>> {
        self.page(room_id, limit, 0).await
    }

    /// Hide a message from history.
    pub async fn soft_delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE messages SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count visible messages in a room.
    pub async fn count(&self, room_id: RoomId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE room_id = ? AND is_deleted = 0",
        )
        .bind(room_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}
