//! HTTP error type for thesis-tracker

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Workflow precondition not met (422)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Caller identity missing or malformed (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the role or ownership for the action (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate assignment or concurrent modification (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<thesis_common::Error> for ApiError {
    fn from(err: thesis_common::Error) -> Self {
        use thesis_common::Error as E;
        match err {
            E::NotFound(msg) => ApiError::NotFound(msg),
            E::InvalidState(msg) => ApiError::InvalidState(msg),
            E::Forbidden(msg) => ApiError::Forbidden(msg),
            E::Conflict(msg) => ApiError::Conflict(msg),
            E::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::InvalidState(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_STATE", msg)
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
