//! Middleware for the HTTP API.

pub mod auth;
pub mod cors;

pub use auth::AuthUser;
pub use cors::create_cors_layer;
