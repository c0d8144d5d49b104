//! Real-time wire events.
//!
//! Every frame is `{"event": <name>, "data": {...}}` with snake_case names.

use serde::{Deserialize, Serialize};

use super::error::{ChatError, DenyReason};
use super::message::{Message, MessageKind};
use super::types::{Identity, RoomId};
use crate::room::RoomView;

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Present a bearer credential.
    Authenticate {
        /// Access token, optionally prefixed with `Bearer `.
        credential: String,
    },
    /// Enter a room.
    JoinRoom {
        /// Room ID.
        room_id: RoomId,
        /// Secret for protected rooms.
        #[serde(default)]
        secret: Option<String>,
    },
    /// Leave a room.
    LeaveRoom {
        /// Room ID.
        room_id: RoomId,
    },
    /// Post a message.
    SendMessage {
        /// Room ID.
        room_id: RoomId,
        /// Text body.
        content: String,
        /// Payload kind; defaults to text.
        #[serde(default)]
        kind: MessageKind,
    },
    /// Started typing.
    Typing {
        /// Room ID.
        room_id: RoomId,
    },
    /// Stopped typing.
    StopTyping {
        /// Room ID.
        room_id: RoomId,
    },
    /// Heartbeat.
    Ping,
}

impl ClientEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Authenticate { .. } => "authenticate",
            ClientEvent::JoinRoom { .. } => "join_room",
            ClientEvent::LeaveRoom { .. } => "leave_room",
            ClientEvent::SendMessage { .. } => "send_message",
            ClientEvent::Typing { .. } => "typing",
            ClientEvent::StopTyping { .. } => "stop_typing",
            ClientEvent::Ping => "ping",
        }
    }
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Authentication succeeded.
    Authenticated {
        /// Bound identity.
        identity: Identity,
    },
    /// Authentication failed; the connection stays open.
    AuthenticationError {
        /// Human-readable reason.
        reason: String,
    },
    /// Room entered; sent to the joining connection only.
    JoinRoomSuccess {
        /// Room metadata.
        room: RoomView,
        /// Recent messages, oldest first.
        backlog: Vec<Message>,
        /// Identities currently present.
        members: Vec<Identity>,
    },
    /// Room entry refused.
    JoinRoomError {
        /// Room ID.
        room_id: RoomId,
        /// Why entry was refused.
        reason: DenyReason,
    },
    /// Acknowledges `leave_room`.
    LeftRoom {
        /// Room ID.
        room_id: RoomId,
    },
    /// A message was accepted in a room.
    NewMessage {
        /// Room ID.
        room_id: RoomId,
        /// The message.
        message: Message,
    },
    /// Someone entered the room.
    UserJoined {
        /// Room ID.
        room_id: RoomId,
        /// Who joined.
        identity: Identity,
    },
    /// Someone left the room.
    UserLeft {
        /// Room ID.
        room_id: RoomId,
        /// Who left.
        identity: Identity,
    },
    /// Someone is typing.
    UserTyping {
        /// Room ID.
        room_id: RoomId,
        /// Who is typing.
        identity: Identity,
    },
    /// Someone stopped typing.
    UserStopTyping {
        /// Room ID.
        room_id: RoomId,
        /// Who stopped.
        identity: Identity,
    },
    /// Live connection count of a room.
    RoomPresenceCount {
        /// Room ID.
        room_id: RoomId,
        /// Number of connections present.
        count: usize,
    },
    /// Request failed.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },
    /// Heartbeat reply.
    Pong,
}

impl ServerEvent {
    /// Build an `error` event from a chat error.
    pub fn error(err: &ChatError) -> Self {
        ServerEvent::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Build an `error` event from a code and message.
    pub fn error_with(code: &str, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
