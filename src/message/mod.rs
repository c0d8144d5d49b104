//! Durable chat message history.

mod repository;
mod store;

pub use repository::MessageRepository;
pub use store::SqlMessageStore;
