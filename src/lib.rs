//! Huddle - room-based real-time chat server
//!
//! Users authenticate with a bearer token, join public or secret-protected
//! rooms, exchange persisted messages and see live presence and typing
//! indicators over a WebSocket.

pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod message;
pub mod room;
pub mod web;

pub use auth::{
    hash_password, hash_secret, verify_password, CredentialError, CredentialVerifier,
    JwtCredentialVerifier, JwtState, PasswordError,
};
pub use chat::{
    AccessDecision, ChatError, ChatHub, ClientEvent, ConnectionSession, DenyReason, Identity,
    Message, MessageKind, MessageStore, RoomDirectory, ServerEvent,
};
pub use config::{ChatConfig, Config, DisconnectPolicy, RoomSeed};
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{HuddleError, Result};
pub use message::{MessageRepository, SqlMessageStore};
pub use room::{MembershipRepository, NewRoom, Room, RoomRepository, SqlRoomDirectory};
pub use web::WebServer;
