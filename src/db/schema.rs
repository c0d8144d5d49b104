//! Database schema and migrations for Huddle.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script executed in order. The schema_version
/// table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL COLLATE NOCASE,
    password    TEXT NOT NULL,
    avatar_url  TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    last_seen   TEXT
);

CREATE UNIQUE INDEX idx_users_username_nocase ON users(username COLLATE NOCASE);
"#,
    // v2: rooms
    r#"
CREATE TABLE rooms (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE,
    description     TEXT,
    password_hash   TEXT,
    is_protected    INTEGER NOT NULL DEFAULT 0,
    max_users       INTEGER NOT NULL DEFAULT 50,
    category        TEXT NOT NULL DEFAULT 'general',
    is_active       INTEGER NOT NULL DEFAULT 1,
    created_by      INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at      TEXT NOT NULL
);

CREATE INDEX idx_rooms_is_active ON rooms(is_active);
"#,
    // v3: room memberships
    r#"
CREATE TABLE user_rooms (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    room_id     INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
    role        TEXT NOT NULL DEFAULT 'member',
    is_active   INTEGER NOT NULL DEFAULT 1,
    joined_at   TEXT NOT NULL,
    left_at     TEXT,
    UNIQUE (user_id, room_id)
);

CREATE INDEX idx_user_rooms_room_active ON user_rooms(room_id, is_active);
"#,
    // v4: messages
    r#"
CREATE TABLE messages (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    room_id         INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    author_name     TEXT NOT NULL,
    content         TEXT NOT NULL,
    message_type    TEXT NOT NULL DEFAULT 'text',
    file_url        TEXT,
    file_size       INTEGER,
    link_provider   TEXT,
    link_video_id   TEXT,
    is_deleted      INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE INDEX idx_messages_room_id ON messages(room_id, id);
"#,
];
