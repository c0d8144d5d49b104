//! HTTP API handlers.

pub mod auth;
pub mod rooms;

pub use auth::*;
pub use rooms::*;

use std::sync::Arc;

use crate::auth::{CredentialVerifier, JwtState};
use crate::chat::ChatHub;
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database handle.
    pub db: Database,
    /// Token signing state.
    pub jwt: Arc<JwtState>,
    /// Bearer credential verifier.
    pub credentials: Arc<dyn CredentialVerifier>,
    /// Real-time chat coordinator.
    pub hub: Arc<ChatHub>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Database,
        jwt: Arc<JwtState>,
        credentials: Arc<dyn CredentialVerifier>,
        hub: Arc<ChatHub>,
    ) -> Self {
        Self {
            db,
            jwt,
            credentials,
            hub,
        }
    }
}
