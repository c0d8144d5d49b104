//! Process-wide chat coordinator.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use super::access::{AccessEvaluator, SecretAttemptLimiter};
use super::broadcaster::RoomBroadcaster;
use super::directory::{MessageStore, RoomDirectory};
use super::outbox::{Outbox, OutboxReceiver};
use super::registry::SessionRegistry;
use super::session::ConnectionSession;
use super::types::RoomId;
use crate::auth::CredentialVerifier;
use crate::config::ChatConfig;

/// Shared state behind every connection session.
///
/// Writes that must appear to room members in acceptance order (message
/// persistence, and the backlog snapshot taken on join) run under a per-room
/// async lock. Unrelated rooms never contend.
pub struct ChatHub {
    pub(super) registry: Arc<SessionRegistry>,
    pub(super) broadcaster: RoomBroadcaster,
    pub(super) access: AccessEvaluator,
    pub(super) directory: Arc<dyn RoomDirectory>,
    pub(super) messages: Arc<dyn MessageStore>,
    pub(super) credentials: Arc<dyn CredentialVerifier>,
    pub(super) config: ChatConfig,
    room_locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl ChatHub {
    /// Create a hub over its collaborators.
    pub fn new(
        config: ChatConfig,
        directory: Arc<dyn RoomDirectory>,
        messages: Arc<dyn MessageStore>,
        credentials: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let limiter = SecretAttemptLimiter::new(
            config.secret_attempt_limit,
            Duration::from_secs(config.secret_attempt_window_secs),
        );

        Self {
            broadcaster: RoomBroadcaster::new(registry.clone()),
            access: AccessEvaluator::new(directory.clone(), limiter),
            registry,
            directory,
            messages,
            credentials,
            config,
            room_locks: DashMap::new(),
        }
    }

    /// Open a session for a new transport connection.
    ///
    /// The receiver yields every event addressed to the connection.
    pub fn connect(self: &Arc<Self>) -> (ConnectionSession, OutboxReceiver) {
        let (outbox, rx) = Outbox::channel(self.config.outbox_capacity);
        let session = ConnectionSession::new(self.clone(), outbox);
        info!(connection = %session.id(), "Connection opened");
        (session, rx)
    }

    /// The session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The access evaluator.
    pub fn access(&self) -> &AccessEvaluator {
        &self.access
    }

    /// Chat settings.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Live connection count of a room.
    pub fn presence_count(&self, room_id: RoomId) -> usize {
        self.registry.presence_count(room_id)
    }

    pub(super) fn room_lock(&self, room_id: RoomId) -> Arc<Mutex<()>> {
        Arc::clone(&self.room_locks.entry(room_id).or_default())
    }
}
