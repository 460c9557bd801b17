//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::SosId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2003,
///     "message": "sos request already handled",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
/// | 4000–4999 | Auth            | 401 / 403                    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed (malformed input, bad coordinates).
    #[error("invalid request: {0}")]
    Validation(String),

    /// Status value is not a member of the recognized set.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// SOS request with the given ID was not found.
    #[error("sos request not found: {0}")]
    NotFound(SosId),

    /// Status transition attempted from a terminal or incompatible state.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status of the request.
        from: String,
        /// Requested target status.
        to: String,
    },

    /// The request left the Pending state before this acceptance attempt.
    #[error("sos request {0} has already been handled")]
    AlreadyHandled(SosId),

    /// A concurrent acceptance by a different volunteer won the race.
    #[error("sos request {0} has already been accepted by another volunteer")]
    AlreadyAssigned(SosId),

    /// Bearer credential missing, malformed, or expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Actor lacks authorization for the requested transition or read.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::InvalidStatus(_) => 1002,
            Self::NotFound(_) => 2001,
            Self::InvalidTransition { .. } => 2002,
            Self::AlreadyHandled(_) => 2003,
            Self::AlreadyAssigned(_) => 2004,
            Self::Persistence(_) => 3001,
            Self::Internal(_) => 3000,
            Self::Unauthorized(_) => 4001,
            Self::Forbidden(_) => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } | Self::AlreadyHandled(_) | Self::AlreadyAssigned(_) => {
                StatusCode::CONFLICT
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
