//! API error types with HTTP status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use agora_core::wire::{ErrorBody, ErrorResponse};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// API error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The debate (or other resource) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The debate exists but is in the wrong lifecycle phase
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed or disallowed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness or mutual-exclusion violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The generation backend failed or returned garbage
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// The generation backend cannot be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Anything else; details are logged, never sent to clients
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::InvalidState(msg) => (StatusCode::BAD_REQUEST, "INVALID_STATE", msg.clone()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILURE", msg.clone()),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
            ApiError::Internal(msg) => {
                // Internal detail stays in the logs
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<agora_persist::StorageError> for ApiError {
    fn from(e: agora_persist::StorageError) -> Self {
        match e {
            agora_persist::StorageError::NotFound(msg) => ApiError::NotFound(msg),
            agora_persist::StorageError::AlreadyExists(msg) => ApiError::Conflict(msg),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<agora_llm::LlmError> for ApiError {
    fn from(e: agora_llm::LlmError) -> Self {
        match e {
            agora_llm::LlmError::ConnectionFailed(_) | agora_llm::LlmError::NotAvailable => {
                ApiError::ServiceUnavailable("The AI backend is unavailable".to_string())
            }
            other => {
                tracing::error!(error = %other, "LLM call failed");
                ApiError::Upstream("The AI backend failed to produce a response".to_string())
            }
        }
    }
}
