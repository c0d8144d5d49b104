//! HTTP and WebSocket surface for Huddle.
//!
//! Account and room directory endpoints live under `/api`; the real-time
//! chat protocol runs over `/ws`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod ws;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
