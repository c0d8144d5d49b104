//! Request body validation.

use std::borrow::Cow;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::web::error::ApiError;

/// JSON body that has passed its `validator` rules.
///
/// Unparseable bodies are a 400; rule violations are a 422 carrying the
/// per-field messages.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = match Json::<T>::from_request(req, state).await {
            Ok(Json(body)) => body,
            Err(rejection) => return Err(ApiError::bad_request(rejection.body_text())),
        };
        body.validate().map_err(ApiError::from_validation_errors)?;
        Ok(Self(body))
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Room secrets are single-line printable text.
pub fn no_control_chars(value: &str) -> Result<(), ValidationError> {
    match value.chars().any(char::is_control) {
        true => Err(invalid("no_control_chars", "Must not contain control characters")),
        false => Ok(()),
    }
}

/// Usernames are ASCII letters, digits, `_` and `-`.
pub fn username_chars(value: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-');
    match value.chars().all(allowed) {
        true => Ok(()),
        false => Err(invalid(
            "username_chars",
            "Username may only contain letters, digits, '_' and '-'",
        )),
    }
}
