//! Real-time room chat core.
//!
//! - [`SessionRegistry`]: live connections, bound identities and room presence
//! - [`RoomBroadcaster`]: fan-out of events to the connections in a room
//! - [`AccessEvaluator`]: room entry policy for public and protected rooms
//! - [`ConnectionSession`]: the per-connection protocol state machine
//! - [`ChatHub`]: shared state tying these to the durable collaborators
//!
//! Durable state is reached only through [`RoomDirectory`], [`MessageStore`]
//! and [`crate::auth::CredentialVerifier`].

mod access;
mod broadcaster;
mod directory;
mod error;
mod events;
mod hub;
pub mod link;
mod message;
mod outbox;
mod registry;
mod session;
mod state;
mod types;

pub use access::{AccessDecision, AccessEvaluator, AttemptCheck, SecretAttemptLimiter};
pub use broadcaster::RoomBroadcaster;
pub use directory::{MessageStore, RoomDirectory};
pub use error::{ChatError, DenyReason};
pub use events::{ClientEvent, ServerEvent};
pub use hub::ChatHub;
pub use message::{Message, MessageKind, NewMessage};
pub use outbox::{DeliveryError, EvictionSignal, Outbox, OutboxReceiver};
pub use registry::{Departure, RoomMember, SessionRegistry};
pub use session::ConnectionSession;
pub use state::ConnectionState;
pub use types::{ConnectionId, Identity, RoomId};
