//! Room and membership repositories.

use chrono::Utc;
use tracing::info;

use super::types::{Membership, NewRoom, Room, RoomId, RoomMemberInfo, RoomSummary};
use crate::auth::hash_secret;
use crate::config::RoomSeed;
use crate::db::DbPool;
use crate::{HuddleError, Result};

const ROOM_COLUMNS: &str = "id, name, description, password_hash, is_protected, max_users, \
                            category, is_active, created_by, created_at";

const MEMBERSHIP_COLUMNS: &str = "id, user_id, room_id, role, is_active, joined_at, left_at";

/// Repository for room records.
pub struct RoomRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RoomRepository<'a> {
    /// Create a new RoomRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a room.
    pub async fn create(&self, new_room: &NewRoom) -> Result<Room> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO rooms (name, description, password_hash, is_protected, max_users,
                                category, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&new_room.name)
        .bind(&new_room.description)
        .bind(&new_room.secret_hash)
        .bind(new_room.secret_hash.is_some())
        .bind(new_room.capacity)
        .bind(&new_room.category)
        .bind(new_room.created_by)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| HuddleError::NotFound("room".to_string()))
    }

    /// Get a room by ID, active or not.
    pub async fn get_by_id(&self, id: RoomId) -> Result<Option<Room>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?");
        let room = sqlx::query_as::<_, Room>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(room)
    }

    /// Get an active room by ID.
    pub async fn get_active(&self, id: RoomId) -> Result<Option<Room>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ? AND is_active = 1");
        let room = sqlx::query_as::<_, Room>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(room)
    }

    /// Get a room by its unique name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Room>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE name = ?");
        let room = sqlx::query_as::<_, Room>(&sql)
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        Ok(room)
    }

    /// List active rooms with their active membership counts, oldest first.
    pub async fn list_active(&self) -> Result<Vec<RoomSummary>> {
        let rooms = sqlx::query_as::<_, RoomSummary>(
            "SELECT r.id, r.name, r.description, r.is_protected, r.category, r.max_users,
                    COUNT(ur.id) AS member_count, r.created_at
             FROM rooms r
             LEFT JOIN user_rooms ur ON ur.room_id = r.id AND ur.is_active = 1
             WHERE r.is_active = 1
             GROUP BY r.id
             ORDER BY r.created_at ASC, r.id ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rooms)
    }

    /// Activate or deactivate a room.
    pub async fn set_active(&self, id: RoomId, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE rooms SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Create every seed room whose name is not taken yet.
    ///
    /// Returns the number of rooms created.
    pub async fn seed(&self, seeds: &[RoomSeed]) -> Result<usize> {
        let mut created = 0;

        for seed in seeds {
            if self.get_by_name(&seed.name).await?.is_some() {
                continue;
            }

            let mut new_room = NewRoom::new(&seed.name)
                .with_category(&seed.category)
                .with_capacity(seed.capacity);
            if let Some(description) = &seed.description {
                new_room = new_room.with_description(description);
            }
            if let Some(secret) = &seed.secret {
                let hash = hash_secret(secret).map_err(|e| HuddleError::Config(e.to_string()))?;
                new_room = new_room.with_secret_hash(hash);
            }

            let room = self.create(&new_room).await?;
            info!(room_id = room.id, name = %room.name, protected = room.is_protected, "Seeded room");
            created += 1;
        }

        Ok(created)
    }
}

/// Repository for persisted room memberships.
pub struct MembershipRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> MembershipRepository<'a> {
    /// Create a new MembershipRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Find the membership record for a user in a room, active or not.
    pub async fn find(&self, user_id: i64, room_id: RoomId) -> Result<Option<Membership>> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM user_rooms WHERE user_id = ? AND room_id = ?"
        );
        let membership = sqlx::query_as::<_, Membership>(&sql)
            .bind(user_id)
            .bind(room_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(membership)
    }

    /// Grant (or re-activate) a membership.
    ///
    /// Re-granting an already active membership keeps its original join time.
    pub async fn grant(&self, user_id: i64, room_id: RoomId) -> Result<Membership> {
        sqlx::query(
            "INSERT INTO user_rooms (user_id, room_id, is_active, joined_at)
             VALUES (?, ?, 1, ?)
             ON CONFLICT (user_id, room_id) DO UPDATE SET
                 joined_at = CASE WHEN user_rooms.is_active = 1
                                  THEN user_rooms.joined_at ELSE excluded.joined_at END,
                 is_active = 1,
                 left_at = NULL",
        )
        .bind(user_id)
        .bind(room_id)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        self.find(user_id, room_id)
            .await?
            .ok_or_else(|| HuddleError::NotFound("membership".to_string()))
    }

    /// Revoke a membership. Returns whether an active membership was revoked.
    pub async fn revoke(&self, user_id: i64, room_id: RoomId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user_rooms SET is_active = 0, left_at = ?
             WHERE user_id = ? AND room_id = ? AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(room_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count active memberships in a room.
    pub async fn count_active(&self, room_id: RoomId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_rooms WHERE room_id = ? AND is_active = 1",
        )
        .bind(room_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// List active members of a room, earliest join first.
    pub async fn active_members(&self, room_id: RoomId) -> Result<Vec<RoomMemberInfo>> {
        let members = sqlx::query_as::<_, RoomMemberInfo>(
            "SELECT u.id AS user_id, u.username, u.avatar_url, ur.role, ur.joined_at
             FROM user_rooms ur
             JOIN users u ON u.id = ur.user_id
             WHERE ur.room_id = ? AND ur.is_active = 1
             ORDER BY ur.joined_at ASC, ur.id ASC",
        )
        .bind(room_id)
        .fetch_all(self.pool)
        .await?;
        Ok(members)
    }
}
