//! Room fan-out.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::events::ServerEvent;
use super::outbox::{DeliveryError, Outbox};
use super::registry::{Departure, SessionRegistry};
use super::types::{ConnectionId, RoomId};

/// Delivers events to every connection present in a room.
///
/// A connection whose outbox is closed is skipped; its own close cleans it
/// up. A connection whose outbox is full has fallen behind and is evicted:
/// it leaves every room it was present in and its transport is told to hang
/// up, so it never resumes with a gap in the stream.
#[derive(Clone)]
pub struct RoomBroadcaster {
    registry: Arc<SessionRegistry>,
}

impl RoomBroadcaster {
    /// Create a broadcaster over a registry.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `event` to the room, optionally skipping one connection.
    ///
    /// Returns the number of connections the event was queued for.
    pub fn broadcast(
        &self,
        room_id: RoomId,
        event: ServerEvent,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let event = Arc::new(event);
        let mut delivered = 0;
        let mut lagging = Vec::new();

        for member in self.registry.members_of(room_id) {
            if Some(member.connection_id) == exclude {
                continue;
            }
            match member.outbox.deliver(event.clone()) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Full) => lagging.push(member),
                Err(DeliveryError::Closed) => {
                    debug!(connection = %member.connection_id, room_id, "Skipping closed outbox");
                }
            }
        }

        trace!(room_id, delivered, "Broadcast complete");
        for member in lagging {
            self.evict(member.connection_id, &member.outbox);
        }
        delivered
    }

    /// Remove a connection that cannot keep up and tell its rooms.
    pub fn evict(&self, connection_id: ConnectionId, outbox: &Outbox) {
        let Some(departure) = self.registry.unbind(connection_id) else {
            return;
        };
        warn!(
            connection = %connection_id,
            user_id = departure.identity.as_ref().map(|i| i.id),
            rooms = departure.rooms.len(),
            "Outbox full, evicting connection"
        );
        outbox.evict(departure.clone());
        self.announce_departure(&departure);
    }

    /// Tell each room a departed connection was in that it left.
    pub fn announce_departure(&self, departure: &Departure) {
        let Some(identity) = &departure.identity else {
            return;
        };
        for &room_id in &departure.rooms {
            self.broadcast(
                room_id,
                ServerEvent::UserLeft {
                    room_id,
                    identity: identity.clone(),
                },
                None,
            );
            self.announce_presence(room_id);
        }
    }

    /// Broadcast the room's current presence count to its members.
    ///
    /// Returns the count.
    pub fn announce_presence(&self, room_id: RoomId) -> usize {
        let count = self.registry.presence_count(room_id);
        self.broadcast(room_id, ServerEvent::RoomPresenceCount { room_id, count }, None);
        count
    }
}
