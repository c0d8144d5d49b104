//! SQLite-backed [`RoomDirectory`].

use async_trait::async_trait;

use super::repository::{MembershipRepository, RoomRepository};
use super::types::{Membership, Room, RoomId};
use crate::chat::{ChatError, RoomDirectory};
use crate::db::DbPool;

/// Room directory over the `rooms` and `user_rooms` tables.
#[derive(Clone)]
pub struct SqlRoomDirectory {
    pool: DbPool,
}

impl SqlRoomDirectory {
    /// Create a directory.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomDirectory for SqlRoomDirectory {
    async fn room(&self, room_id: RoomId) -> Result<Option<Room>, ChatError> {
        Ok(RoomRepository::new(&self.pool).get_active(room_id).await?)
    }

    async fn membership(
        &self,
        user_id: i64,
        room_id: RoomId,
    ) -> Result<Option<Membership>, ChatError> {
        Ok(MembershipRepository::new(&self.pool)
            .find(user_id, room_id)
            .await?)
    }

    async fn grant_membership(
        &self,
        user_id: i64,
        room_id: RoomId,
    ) -> Result<Membership, ChatError> {
        Ok(MembershipRepository::new(&self.pool)
            .grant(user_id, room_id)
            .await?)
    }

    async fn revoke_membership(&self, user_id: i64, room_id: RoomId) -> Result<bool, ChatError> {
        Ok(MembershipRepository::new(&self.pool)
            .revoke(user_id, room_id)
            .await?)
    }
}
