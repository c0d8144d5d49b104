//! Shared helpers for Huddle integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use huddle::chat::{OutboxReceiver, ServerEvent};
use huddle::{
    hash_secret, ChatConfig, ChatHub, ClientEvent, ConnectionSession, CredentialVerifier,
    Database, Identity, JwtCredentialVerifier, JwtState, MessageStore, NewRoom, NewUser,
    RoomDirectory, RoomRepository, SqlMessageStore, SqlRoomDirectory, UserRepository,
};

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// A hub over an in-memory database.
pub struct TestChat {
    pub db: Database,
    pub jwt: JwtState,
    pub hub: Arc<ChatHub>,
}

/// Create a hub with SQLite collaborators.
pub async fn setup_chat(config: ChatConfig) -> TestChat {
    let db = Database::open_in_memory().await.unwrap();
    let messages: Arc<dyn MessageStore> = Arc::new(SqlMessageStore::new(db.pool().clone()));
    setup_chat_with_store(db, config, messages)
}

/// Create a hub with a custom message store.
pub fn setup_chat_with_store(
    db: Database,
    config: ChatConfig,
    messages: Arc<dyn MessageStore>,
) -> TestChat {
    let jwt = JwtState::new(JWT_SECRET, 3600);
    let credentials: Arc<dyn CredentialVerifier> =
        Arc::new(JwtCredentialVerifier::new(jwt.clone(), db.pool().clone()));
    let directory: Arc<dyn RoomDirectory> = Arc::new(SqlRoomDirectory::new(db.pool().clone()));
    let hub = Arc::new(ChatHub::new(config, directory, messages, credentials));
    TestChat { db, jwt, hub }
}

/// Create a user and return its identity.
pub async fn create_user(db: &Database, username: &str) -> Identity {
    let user = UserRepository::new(db.pool())
        .create(&NewUser::new(username, "not-a-real-hash"))
        .await
        .unwrap();
    Identity::new(user.id, user.username)
}

/// Create a public room.
pub async fn create_room(db: &Database, name: &str) -> i64 {
    RoomRepository::new(db.pool())
        .create(&NewRoom::new(name))
        .await
        .unwrap()
        .id
}

/// Create a public room with a capacity.
pub async fn create_room_with_capacity(db: &Database, name: &str, capacity: i64) -> i64 {
    RoomRepository::new(db.pool())
        .create(&NewRoom::new(name).with_capacity(capacity))
        .await
        .unwrap()
        .id
}

/// Create a secret-protected room.
pub async fn create_protected_room(db: &Database, name: &str, secret: &str) -> i64 {
    let hash = hash_secret(secret).unwrap();
    RoomRepository::new(db.pool())
        .create(&NewRoom::new(name).with_secret_hash(hash))
        .await
        .unwrap()
        .id
}

/// A connection driven directly through its session.
pub struct TestClient {
    pub session: ConnectionSession,
    pub identity: Option<Identity>,
    rx: OutboxReceiver,
}

impl TestClient {
    /// Handle one client event to completion.
    pub async fn send(&mut self, event: ClientEvent) {
        self.session.handle(event).await;
    }

    /// Handle one raw text frame.
    pub async fn send_frame(&mut self, frame: &str) {
        self.session.handle_frame(frame).await;
    }

    /// Everything queued for this connection so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push((*event).clone());
        }
        events
    }

    pub async fn join(&mut self, room_id: i64, secret: Option<&str>) {
        self.send(ClientEvent::JoinRoom {
            room_id,
            secret: secret.map(str::to_string),
        })
        .await;
    }

    pub async fn say(&mut self, room_id: i64, content: &str) {
        self.send(ClientEvent::SendMessage {
            room_id,
            content: content.to_string(),
            kind: Default::default(),
        })
        .await;
    }

    pub async fn close(&mut self) {
        self.session.close().await;
    }

    pub fn identity(&self) -> Identity {
        self.identity.clone().unwrap()
    }
}

/// Open a connection without authenticating.
pub fn connect_anonymous(chat: &TestChat) -> TestClient {
    let (session, rx) = chat.hub.connect();
    TestClient {
        session,
        identity: None,
        rx,
    }
}

/// Open a connection and authenticate it as `identity`.
pub async fn connect(chat: &TestChat, identity: &Identity) -> TestClient {
    let mut client = connect_anonymous(chat);
    let token = chat.jwt.issue(identity.id, &identity.display_name).unwrap();
    client
        .send(ClientEvent::Authenticate { credential: token })
        .await;

    let events = client.drain();
    assert_eq!(
        events,
        vec![ServerEvent::Authenticated {
            identity: identity.clone()
        }]
    );
    client.identity = Some(identity.clone());
    client
}

/// Message bodies carried by `new_message` events.
pub fn message_bodies(events: &[ServerEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::NewMessage { message, .. } => Some(message.body.clone()),
            _ => None,
        })
        .collect()
}

/// The last presence count announced for `room_id`.
pub fn last_presence(events: &[ServerEvent], room_id: i64) -> Option<usize> {
    events.iter().rev().find_map(|event| match event {
        ServerEvent::RoomPresenceCount { room_id: r, count } if *r == room_id => Some(*count),
        _ => None,
    })
}

/// Test configuration for the HTTP surface.
pub fn create_test_config() -> huddle::Config {
    let mut config = huddle::Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.logging.file = String::new();
    config
}

/// Create a test server with an in-memory database.
pub async fn create_test_server(config: &huddle::Config) -> (axum_test::TestServer, Database) {
    let db = Database::open_in_memory().await.unwrap();
    RoomRepository::new(db.pool())
        .seed(&config.rooms)
        .await
        .unwrap();

    let server = huddle::WebServer::new(config, db.clone()).unwrap();
    let test_server = axum_test::TestServer::new(server.router()).unwrap();
    (test_server, db)
}

/// Register a user through the API and return the response body.
pub async fn register_user(
    server: &axum_test::TestServer,
    username: &str,
    password: &str,
) -> serde_json::Value {
    server
        .post("/api/auth/register")
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .await
        .json::<serde_json::Value>()
}

/// Register a user and return its access token.
pub async fn register_token(server: &axum_test::TestServer, username: &str) -> String {
    let body = register_user(server, username, "password123").await;
    body["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}
