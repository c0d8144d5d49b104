//! Room entry decisions.
//!
//! Policy, in order:
//!
//! 1. The room must exist and be active.
//! 2. Unprotected rooms admit everyone.
//! 3. An active persisted membership admits without a secret.
//! 4. Otherwise a secret is required and must match the stored hash.
//!
//! Secret attempts are counted per user and room. An attempt is reserved
//! before the hash is checked and forgotten only on success, so concurrent
//! guesses cannot overshoot the limit. Once the limit is reached inside the
//! window further attempts are refused until it slides.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use super::directory::RoomDirectory;
use super::error::{ChatError, DenyReason};
use super::types::{Identity, RoomId};
use crate::auth::verify_password;
use crate::room::Room;

/// Outcome of an access check.
#[derive(Debug, Clone)]
pub enum AccessDecision {
    /// Entry allowed.
    Allowed {
        /// The room being entered.
        room: Room,
        /// Whether an existing membership waived the secret.
        via_membership: bool,
    },
    /// Entry refused.
    Denied {
        /// Why.
        reason: DenyReason,
        /// When throttled, how long until another attempt is accepted.
        retry_after: Option<Duration>,
    },
}

impl AccessDecision {
    fn denied(reason: DenyReason) -> Self {
        AccessDecision::Denied {
            reason,
            retry_after: None,
        }
    }

    /// Whether entry is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed { .. })
    }

    /// Convert into the allowed room or the matching error.
    pub fn into_result(self, room_id: RoomId) -> Result<Room, ChatError> {
        match self {
            AccessDecision::Allowed { room, .. } => Ok(room),
            AccessDecision::Denied {
                reason,
                retry_after,
            } => Err(match reason {
                DenyReason::NotFound => ChatError::NotFound(format!("room {room_id}")),
                DenyReason::SecretRequired => ChatError::SecretRequired,
                DenyReason::SecretInvalid => ChatError::SecretInvalid,
                DenyReason::RoomFull => ChatError::RoomFull,
                DenyReason::TooManyAttempts => ChatError::TooManyAttempts {
                    retry_after_secs: retry_after.map_or(0, whole_seconds_up),
                },
            }),
        }
    }
}

fn whole_seconds_up(d: Duration) -> u64 {
    (d.as_secs() + u64::from(d.subsec_nanos() > 0)).max(1)
}

/// Result of a throttle check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptCheck {
    /// Another attempt may be made.
    Allowed,
    /// Too many recent failures.
    Throttled {
        /// Time until the oldest failure leaves the window.
        retry_after: Duration,
    },
}

/// Sliding-window counter of unsuccessful secret attempts per (user, room).
#[derive(Debug)]
pub struct SecretAttemptLimiter {
    max_failures: u32,
    window: Duration,
    failures: DashMap<(i64, RoomId), Vec<Instant>>,
}

impl SecretAttemptLimiter {
    /// Create a limiter. A limit of zero disables throttling.
    pub fn new(max_failures: u32, window: Duration) -> Self {
        Self {
            max_failures,
            window,
            failures: DashMap::new(),
        }
    }

    /// Reserve an attempt for a user on a room.
    ///
    /// `Allowed` means the attempt now counts against the window; call
    /// [`clear`](Self::clear) if it succeeds.
    pub fn acquire(&self, user_id: i64, room_id: RoomId) -> AttemptCheck {
        if self.max_failures == 0 {
            return AttemptCheck::Allowed;
        }

        let window = self.window;
        let mut attempts = self.failures.entry((user_id, room_id)).or_default();
        attempts.retain(|t| t.elapsed() < window);

        if attempts.len() >= self.max_failures as usize {
            let retry_after = attempts
                .iter()
                .min()
                .map_or(Duration::ZERO, |oldest| window.saturating_sub(oldest.elapsed()));
            return AttemptCheck::Throttled { retry_after };
        }
        attempts.push(Instant::now());
        AttemptCheck::Allowed
    }

    /// Give back the newest reservation when the attempt was never judged.
    pub fn release(&self, user_id: i64, room_id: RoomId) {
        if let Some(mut attempts) = self.failures.get_mut(&(user_id, room_id)) {
            attempts.pop();
        }
    }

    /// Forget failures after a successful attempt.
    pub fn clear(&self, user_id: i64, room_id: RoomId) {
        self.failures.remove(&(user_id, room_id));
    }

    /// Drop entries whose failures have all expired.
    pub fn cleanup(&self) {
        let window = self.window;
        self.failures.retain(|_, failures| {
            failures.retain(|t| t.elapsed() < window);
            !failures.is_empty()
        });
    }
}

/// Decides whether an identity may enter a room.
pub struct AccessEvaluator {
    directory: Arc<dyn RoomDirectory>,
    limiter: SecretAttemptLimiter,
}

impl AccessEvaluator {
    /// Create an evaluator.
    pub fn new(directory: Arc<dyn RoomDirectory>, limiter: SecretAttemptLimiter) -> Self {
        Self { directory, limiter }
    }

    /// Evaluate access. Has no side effects besides throttle bookkeeping.
    ///
    /// `Err` means the directory could not be consulted.
    pub async fn evaluate(
        &self,
        identity: &Identity,
        room_id: RoomId,
        secret: Option<&str>,
    ) -> Result<AccessDecision, ChatError> {
        let Some(room) = self.directory.room(room_id).await? else {
            return Ok(AccessDecision::denied(DenyReason::NotFound));
        };

        if !room.is_protected {
            return Ok(AccessDecision::Allowed {
                room,
                via_membership: false,
            });
        }

        let membership = self.directory.membership(identity.id, room_id).await?;
        if membership.is_some_and(|m| m.is_active) {
            return Ok(AccessDecision::Allowed {
                room,
                via_membership: true,
            });
        }

        let Some(secret) = secret.filter(|s| !s.is_empty()) else {
            return Ok(AccessDecision::denied(DenyReason::SecretRequired));
        };

        if let AttemptCheck::Throttled { retry_after } = self.limiter.acquire(identity.id, room_id) {
            warn!(
                user_id = identity.id,
                room_id,
                "Secret attempts throttled for {}s",
                whole_seconds_up(retry_after)
            );
            return Ok(AccessDecision::Denied {
                reason: DenyReason::TooManyAttempts,
                retry_after: Some(retry_after),
            });
        }

        let Some(hash) = room.password_hash.clone() else {
            warn!(room_id, "Protected room has no stored secret");
            return Ok(AccessDecision::denied(DenyReason::SecretInvalid));
        };

        let secret = secret.to_string();
        let matched = tokio::task::spawn_blocking(move || verify_password(&secret, &hash).is_ok())
            .await
            .map_err(|e| {
                self.limiter.release(identity.id, room_id);
                ChatError::PersistenceFailure(format!("secret check aborted: {e}"))
            })?;

        if matched {
            self.limiter.clear(identity.id, room_id);
            Ok(AccessDecision::Allowed {
                room,
                via_membership: false,
            })
        } else {
            debug!(user_id = identity.id, room_id, "Room secret mismatch");
            Ok(AccessDecision::denied(DenyReason::SecretInvalid))
        }
    }

    /// The failed-attempt limiter.
    pub fn limiter(&self) -> &SecretAttemptLimiter {
        &self.limiter
    }
}
