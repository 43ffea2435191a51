// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::identity::IdentityError;
use crate::store::StoreError;

/// Domain error with an internal kind, mapped to an HTTP status only at the
/// response boundary. Every rejection path in the API funnels into exactly
/// one of these and renders as `{ "code": <status>, "message": <text> }`.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request (also covers missing/invalid credentials and
    // verified-but-unknown accounts; see access gate)
    BadRequest(String),

    // 400 Bad Request (malformed payloads)
    Validation(String),

    // 403 Forbidden (authorization policy violation)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (unique constraint violations)
    Conflict(String),

    // 500 Internal Server Error
    Internal(String),

    // 502 Bad Gateway (store unreachable)
    Upstream(String),
}

impl ApiError {
    /// HTTP status code carried in the response body as `code`
    pub fn code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Validation(_) => 400,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::Internal(_) => 500,
            ApiError::Upstream(_) => 502,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Validation(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::Internal(msg) => msg,
            ApiError::Upstream(msg) => msg,
        }
    }

    /// Uniform error envelope shared by every rejection path
    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code(),
            "message": self.message(),
        })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ApiError::Upstream(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found("The record is not found."),
            StoreError::Conflict(msg) => ApiError::conflict(msg),
            StoreError::Validation(msg) => ApiError::validation(msg),
            StoreError::Unavailable(msg) => {
                tracing::error!("store unreachable: {}", msg);
                ApiError::upstream("The data store is temporarily unavailable.")
            }
            StoreError::Sqlx(e) => {
                // Never expose driver detail to clients
                tracing::error!("store error: {}", e);
                ApiError::internal("An error occurred while processing the request.")
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        // Every verification failure - rejection, outage or a garbled
        // response - surfaces to the client as a 400 with a descriptive
        // message; callers branch on the message, not on the status.
        tracing::warn!("credential verification failed: {}", err);
        ApiError::bad_request(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
