//! Account handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::AppState;
use crate::auth::{hash_password, verify_password};
use crate::db::{NewUser, User, UserRepository};
use crate::web::dto::{
    ApiResponse, LoginRequest, LoginResponse, RegisterRequest, UserInfo, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::HuddleError;

fn login_response(state: &AppState, user: User) -> Result<LoginResponse, ApiError> {
    let access_token = state
        .jwt
        .issue(user.id, &user.username)
        .map_err(|_| ApiError::internal("Failed to generate token"))?;

    Ok(LoginResponse {
        access_token,
        expires_in: state.jwt.expiry_secs,
        user: UserInfo {
            id: user.id,
            username: user.username,
            avatar_url: user.avatar_url,
        },
    })
}

/// POST /api/auth/register - Create an account and log in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());

    if repo.username_exists(&req.username).await? {
        return Err(ApiError::conflict("Username is already taken"));
    }

    let password = req.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {}", e);
            ApiError::internal("An internal error occurred")
        })?
        .map_err(|e| ApiError::unprocessable(e.to_string()))?;

    let mut new_user = NewUser::new(&req.username, hash);
    if let Some(avatar_url) = req.avatar_url {
        new_user = new_user.with_avatar_url(avatar_url);
    }

    // a concurrent registration can still win the unique index
    let user = repo.create(&new_user).await.map_err(|e| match e {
        HuddleError::Conflict(_) => ApiError::conflict("Username is already taken"),
        other => ApiError::from(other),
    })?;

    tracing::info!(user_id = user.id, "Registered user {}", user.username);
    let response = login_response(&state, user)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/login - Exchange credentials for an access token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let repo = UserRepository::new(state.db.pool());
    let user = repo
        .get_by_username(&req.username)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    let password = req.password;
    let stored = user.password.clone();
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| {
            tracing::error!("Password verification task failed: {}", e);
            ApiError::internal("An internal error occurred")
        })?
        .map_err(|_| ApiError::unauthorized("Invalid username or password"))?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    if let Err(e) = repo.touch_last_seen(user.id).await {
        tracing::warn!(user_id = user.id, "Failed to update last_seen: {}", e);
    }

    tracing::info!(user_id = user.id, "User {} logged in", user.username);
    Ok(Json(ApiResponse::new(login_response(&state, user)?)))
}

/// GET /api/auth/me - The authenticated user.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(identity.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(UserInfo {
        id: user.id,
        username: user.username,
        avatar_url: user.avatar_url,
    })))
}
