//! API error handling for the Huddle HTTP surface.
//!
//! Every failure renders as `{"error": {"code", "message", "details"?}}`.

use std::collections::BTreeMap;

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::chat::ChatError;
use crate::HuddleError;

/// Field name to validation messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request (400).
    BadRequest,
    /// Missing or rejected credential (401).
    Unauthorized,
    /// Authenticated but not allowed (403).
    Forbidden,
    /// Unknown room or user (404).
    NotFound,
    /// Username taken (409).
    Conflict,
    /// Field-level validation failure (422).
    ValidationError,
    /// Well-formed but unacceptable input (422).
    UnprocessableEntity,
    /// Throttled (429).
    TooManyRequests,
    /// Anything else (500).
    InternalError,
}

impl From<ErrorCode> for StatusCode {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ValidationError | ErrorCode::UnprocessableEntity => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorPayload<'a>,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    code: ErrorCode,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a FieldErrors>,
}

/// Error returned by HTTP handlers.
#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<FieldErrors>,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Create an error with a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            retry_after_secs: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnprocessableEntity, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// A 429 telling the client when to try again.
    pub fn throttled(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self {
            retry_after_secs: Some(retry_after_secs),
            ..Self::new(ErrorCode::TooManyRequests, message)
        }
    }

    /// Collect `validator` failures into field-level details.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let details: FieldErrors = errors
            .field_errors()
            .into_iter()
            .map(|(field, failures)| {
                let messages = failures
                    .iter()
                    .map(|failure| match &failure.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value for {field}"),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        Self {
            details: Some(details),
            ..Self::new(ErrorCode::ValidationError, "Validation failed")
        }
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Field-level validation details, if any.
    pub fn details(&self) -> Option<&FieldErrors> {
        self.details.as_ref()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorPayload {
                code: self.code,
                message: &self.message,
                details: self.details.as_ref(),
            },
        };
        let mut response = (StatusCode::from(self.code), Json(body)).into_response();

        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

fn internal_from(err: &dyn std::fmt::Display) -> ApiError {
    tracing::error!("Internal error: {}", err);
    ApiError::internal("An internal error occurred")
}

impl From<HuddleError> for ApiError {
    fn from(err: HuddleError) -> Self {
        match &err {
            HuddleError::NotFound(_) => ApiError::not_found(err.to_string()),
            HuddleError::Conflict(_) => ApiError::conflict(err.to_string()),
            _ => internal_from(&err),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match &err {
            ChatError::NotAuthenticated => ApiError::unauthorized(err.to_string()),
            ChatError::NotFound(_) => ApiError::not_found(err.to_string()),
            ChatError::SecretRequired | ChatError::SecretInvalid | ChatError::RoomFull => {
                ApiError::forbidden(err.to_string())
            }
            ChatError::TooManyAttempts { retry_after_secs } => {
                ApiError::throttled(err.to_string(), *retry_after_secs)
            }
            ChatError::InvalidMessage(msg) => ApiError::unprocessable(msg.clone()),
            _ => internal_from(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(StatusCode::from(ErrorCode::Conflict), StatusCode::CONFLICT);
        assert_eq!(
            StatusCode::from(ErrorCode::ValidationError),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            StatusCode::from(ErrorCode::TooManyRequests),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_from_huddle_error() {
        let err: ApiError = HuddleError::NotFound("room".into()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message, "room not found");

        let err: ApiError = HuddleError::Conflict("users".into()).into();
        assert_eq!(err.code(), ErrorCode::Conflict);

        // storage details never leak to clients
        let err: ApiError = HuddleError::Database("disk I/O error".into()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_from_chat_error() {
        let err: ApiError = ChatError::SecretInvalid.into();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let err: ApiError = ChatError::InvalidMessage("empty".into()).into();
        assert_eq!(err.code(), ErrorCode::UnprocessableEntity);

        let err: ApiError = ChatError::PersistenceFailure("io".into()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn test_throttled_sets_retry_after() {
        let err: ApiError = ChatError::TooManyAttempts {
            retry_after_secs: 42,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::TooManyRequests);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");
    }

    #[test]
    fn test_validation_details() {
        #[derive(validator::Validate)]
        struct Signup {
            #[validate(length(min = 3, message = "Too short"))]
            name: String,
        }

        let errors = validator::Validate::validate(&Signup {
            name: "ab".to_string(),
        })
        .unwrap_err();
        let err = ApiError::from_validation_errors(errors);

        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.details().unwrap()["name"], vec!["Too short".to_string()]);
    }
}
