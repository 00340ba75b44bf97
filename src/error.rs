//! Gateway error types.
//!
//! [`GatewayError`] is the error type of the REST layer. Each variant maps
//! to a specific HTTP status code and structured JSON error response.
//! [`RelayError`] describes why a WebSocket relay instance terminated.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Maximum number of upstream body characters echoed back in `details`.
const DETAILS_LIMIT: usize = 200;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "upstream returned 404 Not Found",
///     "details": "{\"message\":\"Entity not found.\"}"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
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
/// | Range     | Category           | HTTP Status                    |
/// |-----------|--------------------|--------------------------------|
/// | 1000–1999 | Validation         | 400 Bad Request                |
/// | 2000–2999 | Upstream responses | upstream status, passed through |
/// | 3000–3999 | Server / transport | 500 / 502 / 504                |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}")]
    UpstreamStatus {
        /// Status code returned by the upstream.
        status: u16,
        /// Truncated upstream response body.
        details: String,
    },

    /// Upstream could not be reached.
    #[error("cannot connect to Home Assistant API: {0}")]
    UpstreamUnavailable(String),

    /// Upstream did not answer in time.
    #[error("timeout connecting to Home Assistant API: {0}")]
    UpstreamTimeout(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Builds an [`GatewayError::UpstreamStatus`], truncating the body.
    #[must_use]
    pub fn upstream_status(status: u16, body: &str) -> Self {
        Self::UpstreamStatus {
            status,
            details: body.chars().take(DETAILS_LIMIT).collect(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::UpstreamStatus { .. } => 2001,
            Self::Internal(_) => 3000,
            Self::UpstreamUnavailable(_) => 3001,
            Self::UpstreamTimeout(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::UpstreamStatus { details, .. } if !details.is_empty() => Some(details.clone()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout(err.to_string())
        } else if err.is_connect() {
            Self::UpstreamUnavailable(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Reason a relay instance stopped.
///
/// Every variant is fatal to the relay; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Opening the upstream event-bus socket failed.
    #[error("upstream connect failed: {0}")]
    UpstreamConnect(String),

    /// Opening the upstream socket took too long.
    #[error("upstream connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Upstream socket errored mid-stream.
    #[error("upstream transport error: {0}")]
    UpstreamTransport(String),

    /// Upstream closed with a non-normal status.
    #[error("upstream closed unexpectedly ({code}): {reason}")]
    UpstreamClosed {
        /// WebSocket close code.
        code: u16,
        /// Close reason text.
        reason: String,
    },

    /// Upstream rejected the access token.
    #[error("upstream rejected authentication: {0}")]
    AuthRejected(String),

    /// Upstream never completed the auth handshake.
    #[error("upstream authentication not completed within {0:?}")]
    AuthTimeout(Duration),

    /// Reading from or writing to the downstream client failed.
    #[error("downstream error: {0}")]
    Downstream(String),

    /// A relay task panicked or was aborted.
    #[error("relay task failed: {0}")]
    Task(String),
}
