//! Bearer authentication extractor.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::CredentialError;
use crate::chat::Identity;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Extractor for authenticated users.
///
/// The token is read from the `Authorization: Bearer` header, or from a
/// `token` query parameter when no header is present.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

        let identity = state.credentials.verify(&token).await.map_err(|e| match e {
            CredentialError::Backend(msg) => {
                tracing::error!("Credential backend error: {}", msg);
                ApiError::internal("An internal error occurred")
            }
            CredentialError::Disabled => ApiError::forbidden("Account is disabled"),
            _ => ApiError::unauthorized("Invalid or expired token"),
        })?;

        Ok(AuthUser(identity))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(header) = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        return header.strip_prefix("Bearer ").map(|t| t.to_string());
    }

    parts.uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "token" {
            urlencoding::decode(value).ok().map(|s| s.into_owned())
        } else {
            None
        }
    })
}
