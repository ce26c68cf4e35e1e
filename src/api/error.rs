//! Mapping of [`Error`] onto HTTP responses.
//!
//! Every error body has the shape `{"error": {"code": ..., "message": ...}}`. Internal
//! failures are logged in full and reported to the client with a generic message.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

/// Error payload returned to API clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Stable machine-readable code
    pub code: &'static str,
    /// Human-readable description
    pub message: String,
}

/// Builds an error response.
pub fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    let body = Json(json!({ "error": err }));
    (status, body).into_response()
}

impl Error {
    /// HTTP status and error code for this error.
    #[must_use]
    pub const fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_failed"),
            Self::Storage { .. } => (StatusCode::BAD_REQUEST, "storage_rejected"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Self::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden"),
            Self::KycRequired => (StatusCode::FORBIDDEN, "kyc_required"),
            Self::LimitExceeded { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "limit_exceeded"),
            Self::Email { .. } | Self::Ocr { .. } | Self::Http(_) => {
                (StatusCode::BAD_GATEWAY, "upstream_failed")
            }
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            match status {
                StatusCode::BAD_GATEWAY => "An upstream service failed".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };
        api_error_response(status, ApiError { code, message })
    }
}
