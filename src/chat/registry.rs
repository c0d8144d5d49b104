//! Session registry: who is connected as whom, and present where.
//!
//! Two concurrent indexes are kept in step:
//!
//! - `connections`: connection -> bound identity, joined rooms, outbox
//! - `rooms`: room -> present connections
//!
//! Mutations of one connection lock its `connections` entry first and the
//! affected `rooms` entries second, never the other way round. Unrelated
//! connections and rooms live in different shards and proceed independently.
//! A room's member map is read under its shard lock, so `members_of` never
//! observes a half-applied update.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use tracing::debug;

use super::error::ChatError;
use super::outbox::Outbox;
use super::types::{ConnectionId, Identity, RoomId};

struct ConnectionEntry {
    identity: Option<Identity>,
    rooms: HashSet<RoomId>,
    outbox: Outbox,
}

/// A connection present in a room.
#[derive(Debug, Clone)]
pub struct RoomMember {
    /// Connection ID.
    pub connection_id: ConnectionId,
    /// Identity bound to the connection.
    pub identity: Identity,
    /// Where to deliver events for this connection.
    pub outbox: Outbox,
}

/// What a connection held when it was removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Departure {
    /// Identity that was bound, if any.
    pub identity: Option<Identity>,
    /// Rooms the connection was present in.
    pub rooms: Vec<RoomId>,
}

/// Process-wide table of live connections and room presence.
#[derive(Default)]
pub struct SessionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    rooms: DashMap<RoomId, HashMap<ConnectionId, RoomMember>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, unauthenticated connection.
    pub fn open(&self, outbox: Outbox) -> ConnectionId {
        let id = ConnectionId::next();
        self.connections.insert(
            id,
            ConnectionEntry {
                identity: None,
                rooms: HashSet::new(),
                outbox,
            },
        );
        debug!(connection = %id, "Connection registered");
        id
    }

    /// Bind an identity to a connection.
    ///
    /// Binding the same identity again is a no-op.
    pub fn bind(&self, id: ConnectionId, identity: Identity) -> Result<(), ChatError> {
        let mut entry = self
            .connections
            .get_mut(&id)
            .ok_or(ChatError::ConnectionClosed)?;

        if let Some(bound) = &entry.identity {
            return if *bound == identity {
                Ok(())
            } else {
                Err(ChatError::AlreadyBound)
            };
        }
        entry.identity = Some(identity);
        Ok(())
    }

    /// Identity bound to a connection.
    pub fn identity(&self, id: ConnectionId) -> Option<Identity> {
        self.connections
            .get(&id)
            .and_then(|entry| entry.identity.clone())
    }

    /// Add a room to a connection's presence set.
    ///
    /// Returns `true` if the connection was not already present.
    pub fn add_membership(&self, id: ConnectionId, room_id: RoomId) -> Result<bool, ChatError> {
        let mut entry = self
            .connections
            .get_mut(&id)
            .ok_or(ChatError::ConnectionClosed)?;
        let identity = entry.identity.clone().ok_or(ChatError::NotAuthenticated)?;

        if !entry.rooms.insert(room_id) {
            return Ok(false);
        }

        let member = RoomMember {
            connection_id: id,
            identity,
            outbox: entry.outbox.clone(),
        };
        self.rooms.entry(room_id).or_default().insert(id, member);
        Ok(true)
    }

    /// Remove a room from a connection's presence set.
    ///
    /// Returns `true` if the connection was present.
    pub fn remove_membership(&self, id: ConnectionId, room_id: RoomId) -> bool {
        let removed = match self.connections.get_mut(&id) {
            Some(mut entry) => {
                let removed = entry.rooms.remove(&room_id);
                if removed {
                    self.detach(id, room_id);
                }
                removed
            }
            None => false,
        };
        if removed {
            self.prune(room_id);
        }
        removed
    }

    /// Point-in-time snapshot of the connections present in a room.
    pub fn members_of(&self, room_id: RoomId) -> Vec<RoomMember> {
        self.rooms
            .get(&room_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether a connection is present in a room.
    pub fn is_member(&self, id: ConnectionId, room_id: RoomId) -> bool {
        self.connections
            .get(&id)
            .is_some_and(|entry| entry.rooms.contains(&room_id))
    }

    /// Number of connections present in a room.
    pub fn presence_count(&self, room_id: RoomId) -> usize {
        self.rooms.get(&room_id).map_or(0, |members| members.len())
    }

    /// Whether any connection of `user_id` is present in a room.
    pub fn has_user_in(&self, room_id: RoomId, user_id: i64) -> bool {
        self.rooms.get(&room_id).is_some_and(|members| {
            members
                .values()
                .any(|member| member.identity.id == user_id)
        })
    }

    /// Rooms a connection is present in.
    pub fn rooms_of(&self, id: ConnectionId) -> Vec<RoomId> {
        self.connections
            .get(&id)
            .map(|entry| entry.rooms.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Remove a connection entirely.
    ///
    /// Returns `None` if the connection was already removed.
    pub fn unbind(&self, id: ConnectionId) -> Option<Departure> {
        let (_, entry) = self.connections.remove(&id)?;

        let mut rooms: Vec<RoomId> = entry.rooms.into_iter().collect();
        rooms.sort_unstable();
        for &room_id in &rooms {
            self.detach(id, room_id);
            self.prune(room_id);
        }

        debug!(connection = %id, rooms = rooms.len(), "Connection unregistered");
        Some(Departure {
            identity: entry.identity,
            rooms,
        })
    }

    fn detach(&self, id: ConnectionId, room_id: RoomId) {
        if let Some(mut members) = self.rooms.get_mut(&room_id) {
            members.remove(&id);
        }
    }

    fn prune(&self, room_id: RoomId) {
        self.rooms.remove_if(&room_id, |_, members| members.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn open(registry: &SessionRegistry) -> ConnectionId {
        let (outbox, _rx) = Outbox::channel(8);
        registry.open(outbox)
    }

    #[test]
    fn test_bind_is_idempotent_for_same_identity() {
        let registry = SessionRegistry::new();
        let id = open(&registry);

        registry.bind(id, Identity::new(1, "alice")).unwrap();
        registry.bind(id, Identity::new(1, "alice")).unwrap();
        assert_eq!(
            registry.bind(id, Identity::new(2, "bob")),
            Err(ChatError::AlreadyBound)
        );
        assert_eq!(registry.identity(id), Some(Identity::new(1, "alice")));
    }

    #[test]
    fn test_membership_requires_bind() {
        let registry = SessionRegistry::new();
        let id = open(&registry);

        assert_eq!(
            registry.add_membership(id, 1),
            Err(ChatError::NotAuthenticated)
        );
        assert_eq!(registry.presence_count(1), 0);
    }

    #[test]
    fn test_add_and_remove_membership() {
        let registry = SessionRegistry::new();
        let a = open(&registry);
        let b = open(&registry);
        registry.bind(a, Identity::new(1, "alice")).unwrap();
        registry.bind(b, Identity::new(2, "bob")).unwrap();

        assert!(registry.add_membership(a, 10).unwrap());
        assert!(!registry.add_membership(a, 10).unwrap());
        assert!(registry.add_membership(b, 10).unwrap());

        assert_eq!(registry.members_of(10).len(), 2);
        assert!(registry.is_member(a, 10));
        assert!(registry.has_user_in(10, 2));

        assert!(registry.remove_membership(a, 10));
        assert!(!registry.remove_membership(a, 10));
        assert!(!registry.is_member(a, 10));
        assert_eq!(registry.presence_count(10), 1);
    }

    #[test]
    fn test_empty_rooms_are_pruned() {
        let registry = SessionRegistry::new();
        let a = open(&registry);
        registry.bind(a, Identity::new(1, "alice")).unwrap();
        registry.add_membership(a, 10).unwrap();
        registry.remove_membership(a, 10);
        assert!(registry.rooms.get(&10).is_none());
    }

    #[test]
    fn test_unbind_clears_everything_once() {
        let registry = SessionRegistry::new();
        let a = open(&registry);
        registry.bind(a, Identity::new(1, "alice")).unwrap();
        registry.add_membership(a, 10).unwrap();
        registry.add_membership(a, 20).unwrap();

        let departure = registry.unbind(a).unwrap();
        assert_eq!(departure.identity, Some(Identity::new(1, "alice")));
        assert_eq!(departure.rooms, vec![10, 20]);

        assert!(registry.unbind(a).is_none());
        assert!(registry.members_of(10).is_empty());
        assert!(registry.members_of(20).is_empty());
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(
            registry.add_membership(a, 10),
            Err(ChatError::ConnectionClosed)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_and_leaves() {
        let registry = Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();

        for user in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (outbox, _rx) = Outbox::channel(8);
                let id = registry.open(outbox);
                registry.bind(id, Identity::new(user, format!("u{user}"))).unwrap();
                for room in 0..4 {
                    registry.add_membership(id, room).unwrap();
                }
                if user % 2 == 0 {
                    registry.unbind(id);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for room in 0..4 {
            assert_eq!(registry.presence_count(room), 16);
        }
        assert_eq!(registry.connection_count(), 16);
    }
}
