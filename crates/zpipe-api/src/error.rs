//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every error response uses the same body shape:
//!
//! ```json
//! { "error": "Bad Request", "message": "...", "statusCode": 400 }
//! ```
//!
//! Input and output validation failures share the 400 status and differ
//! only in message detail: input failures list every violated constraint,
//! output failures say `"Validation failed"`. Internal error details are
//! logged and never returned to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zpipe_core::ValidationError;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrorBody {
    /// Reason phrase of the status code (e.g. `"Bad Request"`).
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Numeric HTTP status code.
    pub status_code: u16,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request data or a handler's return value failed its schema (400).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The body was not JSON, or the query string could not be decoded (400).
    #[error("malformed request: {0}")]
    Malformed(String),

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The response body for this error.
    pub fn body(&self) -> ValidationErrorBody {
        let status = self.status();
        let message = match self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        ValidationErrorBody {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            status_code: status.as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(detail = %detail, "internal error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}
