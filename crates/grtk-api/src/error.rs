//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every error body has the same shape:
//!
//! ```json
//! {"error": {"code": "VALIDATION_ERROR", "message": "...", "details": {...}}}
//! ```
//!
//! | Variant              | Status | Code                  |
//! |----------------------|--------|-----------------------|
//! | `BadRequest`         | 400    | `BAD_REQUEST`         |
//! | `Validation`         | 422    | `VALIDATION_ERROR`    |
//! | `Computation`        | 422    | `COMPUTATION_ERROR`   |
//! | `Busy`               | 503    | `SERVICE_UNAVAILABLE` |
//! | `Timeout`            | 504    | `TIMEOUT`             |
//! | `Internal`           | 500    | `INTERNAL_ERROR`      |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grtk_pipeline::ServiceError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code, e.g. `VALIDATION_ERROR`.
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// The body is not well-formed JSON.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The body is JSON but not a valid request (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// The request is valid but the symbolic computation failed (422).
    #[error("computation error: {0}")]
    Computation(String),

    /// Too many computations in flight (503).
    #[error("service busy: {0}")]
    Busy(String),

    /// The computation exceeded the configured limit (504).
    #[error("computation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Message is logged but not returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Computation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "COMPUTATION_ERROR"),
            Self::Busy(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Timeout { secs } => Some(serde_json::json!({ "timeout_secs": secs })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Timeout { .. } | Self::Busy(_) => tracing::warn!(error = %self, "computation rejected"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(spec) => Self::Validation(format!("invalid metric: {spec}")),
            ServiceError::InvalidPayload(message) => Self::Validation(message),
            ServiceError::Computation(error) => Self::Computation(error.to_string()),
        }
    }
}
