//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.
//!
//! Refused scans are not errors: `NOT_FOUND` and `REENTRY` come back as
//! `200` with the result code in the body. Only malformed requests, unknown
//! entities and storage failures end up here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use turnstile_core::TurnstileError;
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 409 Conflict - A record with the same key already exists.
    Conflict {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional details (not exposed to client in production).
        details: Option<String>,
    },

    /// 503 Service Unavailable - The backing store failed. Safe to retry.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        details: Option<String>,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "invalid_direction",
    "message": "Invalid direction: 'sideways'. Expected 'entry' or 'exit'.",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "invalid_direction").
    #[schema(example = "invalid_direction")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "Invalid direction: 'sideways'. Expected 'entry' or 'exit'.")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// HTTP status this error is rendered with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_response = match self {
            Self::BadRequest { error_code, message }
            | Self::NotFound { error_code, message }
            | Self::Conflict { error_code, message } => ErrorResponse {
                error: error_code,
                message,
                details: None,
            },

            Self::InternalError {
                error_code,
                message,
                details,
            } => {
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    details = ?details,
                    "Internal server error"
                );
                ErrorResponse {
                    error: error_code,
                    message,
                    details: details.map(|d| serde_json::json!(d)),
                }
            }

            Self::ServiceUnavailable {
                error_code,
                message,
                details,
            } => {
                tracing::warn!(
                    error_code = %error_code,
                    details = ?details,
                    "Storage unavailable"
                );
                ErrorResponse {
                    error: error_code,
                    message,
                    details: Some(serde_json::json!({
                        "retryable": true,
                        "cause": details,
                    })),
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
            Self::InternalError { message, .. } => write!(f, "Internal Error: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from turnstile_core errors.
impl From<TurnstileError> for ApiError {
    fn from(err: TurnstileError) -> Self {
        let error_code = err.error_code().to_ascii_lowercase();

        match &err {
            TurnstileError::CannotRead(cause) | TurnstileError::CannotWrite(cause) => {
                Self::ServiceUnavailable {
                    error_code,
                    message: err.to_string(),
                    details: Some(cause.clone()),
                }
            }
            TurnstileError::InvalidDirection(_) | TurnstileError::InvalidBarcode(_) => {
                Self::BadRequest {
                    error_code,
                    message: err.to_string(),
                }
            }
            TurnstileError::TerminalNotFound(_) | TurnstileError::GroupNotFound(_) => {
                Self::NotFound {
                    error_code,
                    message: err.to_string(),
                }
            }
            TurnstileError::TerminalExists(_)
            | TurnstileError::GroupExists(_)
            | TurnstileError::MasterKeyExists(_) => Self::Conflict {
                error_code,
                message: err.to_string(),
            },
            TurnstileError::ConfigNotFound(_)
            | TurnstileError::ConfigParseError(_)
            | TurnstileError::ConfigValidationError(_)
            | TurnstileError::IoError(_) => Self::InternalError {
                error_code,
                message: err.to_string(),
                details: None,
            },
        }
    }
}

/// A blocking task panicked or was cancelled.
impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::InternalError {
            error_code: "task_failed".to_string(),
            message: "Request processing was interrupted".to_string(),
            details: Some(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_error() {
        let err = ApiError::BadRequest {
            error_code: "test_error".to_string(),
            message: "Test message".to_string(),
        };
        assert!(err.to_string().contains("Bad Request"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "test_error".to_string(),
            message: "Test message".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test_error"));
    }

    #[test]
    fn test_storage_errors_are_service_unavailable() {
        let err = ApiError::from(TurnstileError::CannotWrite("disk full".to_string()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        match err {
            ApiError::ServiceUnavailable {
                error_code,
                details,
                ..
            } => {
                assert_eq!(error_code, "cannot_write");
                assert_eq!(details.as_deref(), Some("disk full"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_domain_errors_mapping() {
        let err = ApiError::from(TurnstileError::InvalidDirection("up".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            err,
            ApiError::BadRequest { ref error_code, .. } if error_code == "invalid_direction"
        ));

        let err = ApiError::from(TurnstileError::TerminalNotFound(3));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(TurnstileError::GroupExists("Main".to_string()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
