//! Web API Authentication Tests
//!
//! Integration tests for account endpoints.

mod common;

use axum::http::{header::AUTHORIZATION, StatusCode};
use huddle::UserRepository;
use serde_json::{json, Value};

use common::*;

// ============================================================================
// Registration Tests
// ============================================================================

#[tokio::test]
async fn test_register_success() {
    let (server, _db) = create_test_server(&create_test_config()).await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "testuser",
            "password": "password123"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert!(body["data"]["access_token"].is_string());
    assert_eq!(body["data"]["expires_in"], 86400);
    assert_eq!(body["data"]["user"]["username"], "testuser");
    assert!(body["data"]["user"]["avatar_url"].is_null());
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let (server, _db) = create_test_server(&create_test_config()).await;
    register_user(&server, "testuser", "password123").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "testuser",
            "password": "different456"
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_register_validation() {
    let (server, _db) = create_test_server(&create_test_config()).await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "ab",
            "password": "password123"
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "testuser",
            "password": "short"
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "bad name!",
            "password": "password123"
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_register_with_avatar() {
    let (server, _db) = create_test_server(&create_test_config()).await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "pictured",
            "password": "password123",
            "avatar_url": "https://cdn.example.com/me.png"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(
        body["data"]["user"]["avatar_url"],
        "https://cdn.example.com/me.png"
    );
}

// ============================================================================
// Login Tests
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let (server, _db) = create_test_server(&create_test_config()).await;
    register_user(&server, "testuser", "password123").await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "username": "testuser",
            "password": "password123"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["data"]["access_token"].is_string());
    assert_eq!(body["data"]["user"]["username"], "testuser");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (server, _db) = create_test_server(&create_test_config()).await;
    register_user(&server, "testuser", "password123").await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "username": "testuser",
            "password": "wrongpassword"
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_unknown_user() {
    let (server, _db) = create_test_server(&create_test_config()).await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "username": "nobody",
            "password": "password123"
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_empty_fields() {
    let (server, _db) = create_test_server(&create_test_config()).await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "username": "",
            "password": ""
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_disabled_account() {
    let (server, db) = create_test_server(&create_test_config()).await;
    let body = register_user(&server, "testuser", "password123").await;
    let user_id = body["data"]["user"]["id"].as_i64().unwrap();

    UserRepository::new(db.pool())
        .set_active(user_id, false)
        .await
        .unwrap();

    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "username": "testuser",
            "password": "password123"
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

// ============================================================================
// Current User Tests
// ============================================================================

#[tokio::test]
async fn test_me_with_token() {
    let (server, _db) = create_test_server(&create_test_config()).await;
    let access_token = register_token(&server, "testuser").await;

    let response = server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, format!("Bearer {}", access_token))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["username"], "testuser");
}

#[tokio::test]
async fn test_me_without_token() {
    let (server, _db) = create_test_server(&create_test_config()).await;

    let response = server.get("/api/auth/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_invalid_token() {
    let (server, _db) = create_test_server(&create_test_config()).await;

    let response = server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, "Bearer invalid-token")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let (server, _db) = create_test_server(&create_test_config()).await;
    register_user(&server, "testuser", "password123").await;

    let forged = huddle::JwtState::new("some-other-secret", 3600)
        .issue(1, "testuser")
        .unwrap();

    let response = server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, format!("Bearer {}", forged))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}
