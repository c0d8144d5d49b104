//! WebSocket transport for the real-time chat.

pub mod chat;

pub use chat::chat_ws_handler;
