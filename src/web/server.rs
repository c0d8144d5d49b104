//! Web server for Huddle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::auth::{CredentialVerifier, JwtCredentialVerifier, JwtState};
use crate::chat::ChatHub;
use crate::config::Config;
use crate::message::SqlMessageStore;
use crate::room::SqlRoomDirectory;
use crate::{Database, HuddleError, Result};

use super::handlers::AppState;
use super::router::create_router;

/// HTTP and WebSocket server.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Wire the chat hub and its SQLite collaborators for `config`.
    pub fn new(config: &Config, db: Database) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| HuddleError::Config(format!("invalid server address: {e}")))?;

        let jwt = Arc::new(JwtState::new(
            &config.auth.jwt_secret,
            config.auth.token_expiry_secs,
        ));
        let credentials: Arc<dyn CredentialVerifier> = Arc::new(JwtCredentialVerifier::new(
            (*jwt).clone(),
            db.pool().clone(),
        ));

        let hub = Arc::new(ChatHub::new(
            config.chat.clone(),
            Arc::new(SqlRoomDirectory::new(db.pool().clone())),
            Arc::new(SqlMessageStore::new(db.pool().clone())),
            credentials.clone(),
        ));

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(db, jwt, credentials, hub)),
            cors_origins: config.server.cors_origins.clone(),
        })
    }

    /// Get the configured address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared application state.
    pub fn app_state(&self) -> Arc<AppState> {
        self.app_state.clone()
    }

    /// Build the router without binding.
    pub fn router(&self) -> Router {
        create_router(self.app_state.clone(), &self.cors_origins)
    }

    /// Periodically forget expired secret-attempt failures.
    fn start_limiter_cleanup_task(hub: Arc<ChatHub>) {
        let period = Duration::from_secs(hub.config().secret_attempt_window_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                hub.access().limiter().cleanup();
                tracing::trace!("Secret attempt limiter cleaned up");
            }
        });
    }

    async fn bind(self) -> std::io::Result<(TcpListener, Router)> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        Self::start_limiter_cleanup_task(self.app_state.hub.clone());
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);
        Ok((listener, router))
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Useful in tests when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.auth.jwt_secret = "test-secret-key".to_string();
        config
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let db = Database::open_in_memory().await.unwrap();
        let server = WebServer::new(&test_config(), db).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_invalid_address_rejected() {
        let mut config = test_config();
        config.server.host = "not an address".to_string();
        let db = Database::open_in_memory().await.unwrap();
        assert!(matches!(
            WebServer::new(&config, db),
            Err(HuddleError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_run_with_addr_binds() {
        let db = Database::open_in_memory().await.unwrap();
        let server = WebServer::new(&test_config(), db).unwrap();
        let addr = server.run_with_addr().await.unwrap();
        assert_ne!(addr.port(), 0);
    }
}
