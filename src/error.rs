//! Service- and HTTP-level error types.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::llm::LlmError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller referenced a session id with no live session.
    #[error("session `{0}` not found; start a new game first")]
    SessionNotFound(String),
    /// Caller referenced a puzzle id absent from the lookup cache.
    #[error("puzzle `{0}` not found or expired")]
    PuzzleNotFound(String),
    /// The generative fallback exhausted its attempts without producing a
    /// valid puzzle.
    #[error("puzzle generation failed after {attempts} attempt(s)")]
    GenerationFailed {
        /// How many attempts were made before giving up.
        attempts: usize,
        /// Final backend error, when the failure was the backend itself
        /// rather than invalid generated content.
        #[source]
        source: Option<LlmError>,
    },
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Upstream capability unavailable or exhausted.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::SessionNotFound(_) | ServiceError::PuzzleNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            ServiceError::GenerationFailed { .. } => AppError::ServiceUnavailable(err.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
