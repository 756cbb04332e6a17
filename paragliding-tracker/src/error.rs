//! Error types for paragliding-tracker

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::IngestError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409); `id` names the record already holding the resource
    #[error("Conflict: {message}")]
    Conflict { message: String, id: String },

    /// Upstream track source failed (502)
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// paragliding-common error
    #[error("Common error: {0}")]
    Common(#[from] paragliding_common::Error),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(msg) => ApiError::BadRequest(msg),
            IngestError::Conflict { id } => ApiError::Conflict {
                message: format!("Track already ingested with id {}", id),
                id,
            },
            IngestError::UpstreamParse(e) => ApiError::BadGateway(e.to_string()),
            IngestError::IdExhausted { attempts } => {
                ApiError::Internal(format!("No free track id after {} attempts", attempts))
            }
            IngestError::Store(e) => ApiError::Common(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut existing_id = None;
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict { message, id } => {
                existing_id = Some(id);
                (StatusCode::CONFLICT, "CONFLICT", message)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(paragliding_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(paragliding_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(err) => {
                tracing::error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    err.to_string(),
                )
            }
        };

        let body = match existing_id {
            // Conflicts name the record already holding the resource
            Some(id) => json!({
                "id": id,
                "error": {
                    "code": error_code,
                    "message": message,
                }
            }),
            None => json!({
                "error": {
                    "code": error_code,
                    "message": message,
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
