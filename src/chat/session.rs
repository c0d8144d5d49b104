//! Per-connection event handling.
//!
//! A [`ConnectionSession`] processes its client's events strictly in order.
//! Replies go straight to the connection's outbox; room events go through the
//! broadcaster. Dropping a session without calling [`ConnectionSession::close`]
//! still releases its registry state.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::ChatError;
use super::events::{ClientEvent, ServerEvent};
use super::hub::ChatHub;
use super::message::{MessageKind, NewMessage};
use super::outbox::{DeliveryError, EvictionSignal, Outbox};
use super::registry::Departure;
use super::state::ConnectionState;
use super::types::{ConnectionId, Identity, RoomId};
use crate::auth::CredentialError;
use crate::config::DisconnectPolicy;
use crate::room::RoomView;

/// One live connection's view of the chat.
pub struct ConnectionSession {
    id: ConnectionId,
    hub: Arc<ChatHub>,
    outbox: Outbox,
    state: ConnectionState,
}

impl ConnectionSession {
    pub(super) fn new(hub: Arc<ChatHub>, outbox: Outbox) -> Self {
        let id = hub.registry.open(outbox.clone());
        Self {
            id,
            hub,
            outbox,
            state: ConnectionState::Unauthenticated,
        }
    }

    /// Connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current protocol state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Resolves when the connection is evicted for falling behind.
    pub fn eviction_signal(&self) -> EvictionSignal {
        self.outbox.eviction_signal()
    }

    /// Parse and handle one JSON text frame.
    pub async fn handle_frame(&mut self, frame: &str) {
        match serde_json::from_str::<ClientEvent>(frame) {
            Ok(event) => self.handle(event).await,
            Err(e) => {
                debug!(connection = %self.id, "Unparseable frame: {}", e);
                self.reply(ServerEvent::error_with(
                    "invalid_event",
                    format!("invalid event: {e}"),
                ));
            }
        }
    }

    /// Handle one client event.
    pub async fn handle(&mut self, event: ClientEvent) {
        if self.outbox.is_evicted() {
            self.close().await;
        }
        let name = event.name();
        let identity = match self.state.admit(&event) {
            Ok(identity) => identity.cloned(),
            Err(err) => {
                debug!(connection = %self.id, event = name, "Event refused: {}", err);
                self.reply(ServerEvent::error(&err));
                return;
            }
        };

        match (event, identity) {
            (ClientEvent::Ping, _) => self.reply(ServerEvent::Pong),
            (ClientEvent::Authenticate { credential }, _) => self.authenticate(&credential).await,
            (ClientEvent::JoinRoom { room_id, secret }, Some(identity)) => {
                if let Err(err) = self.join_room(identity, room_id, secret.as_deref()).await {
                    self.log_failure(name, &err);
                    match err.deny_reason() {
                        Some(reason) => self.reply(ServerEvent::JoinRoomError { room_id, reason }),
                        None => self.reply(ServerEvent::error(&err)),
                    }
                }
            }
            (event, Some(identity)) => {
                let result = match event {
                    ClientEvent::LeaveRoom { room_id } => self.leave_room(identity, room_id).await,
                    ClientEvent::SendMessage {
                        room_id,
                        content,
                        kind,
                    } => self.send_message(identity, room_id, &content, kind).await,
                    ClientEvent::Typing { room_id } => {
                        self.relay_typing(identity, room_id, true)
                    }
                    ClientEvent::StopTyping { room_id } => {
                        self.relay_typing(identity, room_id, false)
                    }
                    _ => Ok(()),
                };
                if let Err(err) = result {
                    self.log_failure(name, &err);
                    self.reply(ServerEvent::error(&err));
                }
            }
            (_, None) => self.reply(ServerEvent::error(&ChatError::NotAuthenticated)),
        }
    }

    async fn authenticate(&mut self, credential: &str) {
        let identity = match self.hub.credentials.verify(credential).await {
            Ok(identity) => identity,
            Err(CredentialError::Backend(e)) => {
                warn!(connection = %self.id, "Credential check failed: {}", e);
                self.reply(ServerEvent::error_with(
                    "persistence_failure",
                    "authentication is temporarily unavailable",
                ));
                return;
            }
            Err(e) => {
                debug!(connection = %self.id, "Authentication failed: {}", e);
                self.reply(ServerEvent::AuthenticationError {
                    reason: e.to_string(),
                });
                return;
            }
        };

        let bound = self
            .hub
            .registry
            .bind(self.id, identity.clone())
            .and_then(|()| self.state.authenticate(identity.clone()));

        match bound {
            Ok(()) => {
                info!(
                    connection = %self.id,
                    user_id = identity.id,
                    "Authenticated as {}",
                    identity.display_name
                );
                self.reply(ServerEvent::Authenticated { identity });
            }
            Err(err) => {
                debug!(connection = %self.id, "Authentication refused: {}", err);
                self.reply(ServerEvent::AuthenticationError {
                    reason: err.to_string(),
                });
            }
        }
    }

    async fn join_room(
        &mut self,
        identity: Identity,
        room_id: RoomId,
        secret: Option<&str>,
    ) -> Result<(), ChatError> {
        let room = self
            .hub
            .access
            .evaluate(&identity, room_id, secret)
            .await?
            .into_result(room_id)?;

        let lock = self.hub.room_lock(room_id);
        let _sequenced = lock.lock().await;

        let registry = &self.hub.registry;
        if !registry.has_user_in(room_id, identity.id)
            && registry.presence_count(room_id) >= room.capacity()
        {
            return Err(ChatError::RoomFull);
        }

        self.hub
            .directory
            .grant_membership(identity.id, room_id)
            .await?;
        let backlog = self
            .hub
            .messages
            .backlog(room_id, self.hub.config.backlog_limit)
            .await?;
        let newly_present = registry.add_membership(self.id, room_id)?;

        let mut members: Vec<Identity> = registry
            .members_of(room_id)
            .into_iter()
            .map(|member| member.identity)
            .collect();
        members.sort_by_key(|m| m.id);
        members.dedup_by_key(|m| m.id);

        self.reply(ServerEvent::JoinRoomSuccess {
            room: RoomView::from(&room),
            backlog,
            members,
        });

        if newly_present {
            info!(connection = %self.id, user_id = identity.id, room_id, "Joined room");
            self.hub.broadcaster.broadcast(
                room_id,
                ServerEvent::UserJoined { room_id, identity },
                Some(self.id),
            );
            self.hub.broadcaster.announce_presence(room_id);
        }
        Ok(())
    }

    async fn leave_room(&mut self, identity: Identity, room_id: RoomId) -> Result<(), ChatError> {
        if !self.hub.registry.is_member(self.id, room_id) {
            return Err(ChatError::NotMember(room_id));
        }

        let lock = self.hub.room_lock(room_id);
        let _sequenced = lock.lock().await;

        self.hub.registry.remove_membership(self.id, room_id);
        let revoked = if self.hub.registry.has_user_in(room_id, identity.id) {
            Ok(false)
        } else {
            self.hub
                .directory
                .revoke_membership(identity.id, room_id)
                .await
        };

        info!(connection = %self.id, user_id = identity.id, room_id, "Left room");
        self.reply(ServerEvent::LeftRoom { room_id });
        self.hub
            .broadcaster
            .broadcast(room_id, ServerEvent::UserLeft { room_id, identity }, None);
        self.hub.broadcaster.announce_presence(room_id);

        revoked.map(|_| ())
    }

    async fn send_message(
        &mut self,
        identity: Identity,
        room_id: RoomId,
        content: &str,
        kind: MessageKind,
    ) -> Result<(), ChatError> {
        if !self.hub.registry.is_member(self.id, room_id) {
            return Err(ChatError::NotMember(room_id));
        }

        let message = NewMessage::from_client(
            room_id,
            identity,
            content,
            kind,
            self.hub.config.max_message_length,
        )?;

        let lock = self.hub.room_lock(room_id);
        let _sequenced = lock.lock().await;

        let message = self.hub.messages.append(message).await?;
        debug!(
            connection = %self.id,
            room_id,
            message_id = message.id,
            kind = message.kind.as_str(),
            "Message accepted"
        );
        self.hub
            .broadcaster
            .broadcast(room_id, ServerEvent::NewMessage { room_id, message }, None);
        Ok(())
    }

    fn relay_typing(
        &self,
        identity: Identity,
        room_id: RoomId,
        typing: bool,
    ) -> Result<(), ChatError> {
        if !self.hub.registry.is_member(self.id, room_id) {
            return Err(ChatError::NotMember(room_id));
        }

        let event = if typing {
            ServerEvent::UserTyping { room_id, identity }
        } else {
            ServerEvent::UserStopTyping { room_id, identity }
        };
        self.hub.broadcaster.broadcast(room_id, event, Some(self.id));
        Ok(())
    }

    /// Close the session: release live state, notify rooms, and apply the
    /// disconnect policy to persisted memberships. Idempotent.
    pub async fn close(&mut self) {
        let Some(departure) = self.release() else {
            return;
        };

        let Some(identity) = departure.identity else {
            return;
        };
        if self.hub.config.disconnect_policy != DisconnectPolicy::Revoke {
            return;
        }
        for room_id in departure.rooms {
            if self.hub.registry.has_user_in(room_id, identity.id) {
                continue;
            }
            if let Err(e) = self
                .hub
                .directory
                .revoke_membership(identity.id, room_id)
                .await
            {
                warn!(user_id = identity.id, room_id, "Failed to revoke membership: {}", e);
            }
        }
    }

    fn release(&mut self) -> Option<Departure> {
        if !self.state.close() {
            return None;
        }

        // an evicted connection already left its rooms
        let departure = match self.hub.registry.unbind(self.id) {
            Some(departure) => {
                self.hub.broadcaster.announce_departure(&departure);
                departure
            }
            None => self.outbox.take_eviction()?,
        };

        info!(connection = %self.id, rooms = departure.rooms.len(), "Connection closed");
        Some(departure)
    }

    fn reply(&self, event: ServerEvent) {
        match self.outbox.deliver(Arc::new(event)) {
            Ok(()) => {}
            Err(DeliveryError::Full) => self.hub.broadcaster.evict(self.id, &self.outbox),
            Err(e) => debug!(connection = %self.id, "Reply dropped: {}", e),
        }
    }

    fn log_failure(&self, event: &str, err: &ChatError) {
        if err.is_infrastructure() {
            warn!(connection = %self.id, event, "Event failed: {}", err);
        } else {
            debug!(connection = %self.id, event, "Event rejected: {}", err);
        }
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        let Some(departure) = self.release() else {
            return;
        };
        warn!(connection = %self.id, "Session dropped without close");

        let Some(identity) = departure.identity else {
            return;
        };
        if self.hub.config.disconnect_policy != DisconnectPolicy::Revoke
            || departure.rooms.is_empty()
        {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let hub = self.hub.clone();
        runtime.spawn(async move {
            for room_id in departure.rooms {
                if hub.registry.has_user_in(room_id, identity.id) {
                    continue;
                }
                if let Err(e) = hub.directory.revoke_membership(identity.id, room_id).await {
                    warn!(user_id = identity.id, room_id, "Failed to revoke membership: {}", e);
                }
            }
        });
    }
}
