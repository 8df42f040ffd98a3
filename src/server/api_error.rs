//! Standardized API error responses for all Touchline endpoints.
//!
//! # Response Format
//!
//! ```json
//! {
//!   "error": {
//!     "code": "INVALID_REQUEST",
//!     "message": "Request payload is invalid",
//!     "details": [{ "field": "url", "message": "must be a valid http(s) URL" }]
//!   }
//! }
//! ```
//!
//! The `details` field is omitted when there is nothing to add.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::TouchlineError;
use crate::server::validation::ValidationError;

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // === Validation Errors (400) ===
    /// Request payload or query is invalid or malformed
    InvalidRequest,

    // === Authentication Errors (401) ===
    /// Cron secret missing or wrong
    Unauthorized,

    // === Resource Errors (404) ===
    /// Requested resource was not found
    NotFound,

    // === Server Errors (5xx) ===
    /// Database operation failed
    DatabaseError,
    /// Server configuration error
    ConfigError,
    /// Unexpected internal server error
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DatabaseError | ErrorCode::ConfigError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a default human-readable message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "Request payload is invalid",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::NotFound => "The requested resource was not found",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ConfigError => "Server configuration error",
            ErrorCode::InternalError => "An unexpected error occurred",
        }
    }
}

/// The inner error object containing code, message, and optional details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Standardized API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorBody,
}

impl ApiError {
    /// Creates a new API error with the default message for `code`.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: code.default_message().to_string(),
                details: None,
            },
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.error.code.status_code()
    }

    // === Convenience constructors for common errors ===

    /// 400 carrying one `{field, message}` entry per failed check.
    pub fn validation(errors: Vec<ValidationError>) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null);
        Self::with_details(ErrorCode::InvalidRequest, "Validation failed", details)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized)
    }

    /// Database error (internal details hidden from client).
    pub fn database_error() -> Self {
        Self::new(ErrorCode::DatabaseError)
    }

    pub fn internal_error() -> Self {
        Self::new(ErrorCode::InternalError)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error.code.default_message(),
            self.error.message
        )
    }
}

impl std::error::Error for ApiError {}

impl From<TouchlineError> for ApiError {
    fn from(err: TouchlineError) -> Self {
        match err {
            TouchlineError::NotFound { entity, id } => ApiError::with_message(
                ErrorCode::NotFound,
                format!("{entity} not found: {id}"),
            ),
            TouchlineError::Validation { field, message } => {
                ApiError::validation(vec![ValidationError::new(field, message)])
            }
            TouchlineError::Unauthorized => ApiError::unauthorized(),
            TouchlineError::DatabaseError(msg) => {
                error!("Database error: {}", msg);
                ApiError::database_error()
            }
            TouchlineError::ConfigError(msg) => {
                error!("Configuration error: {}", msg);
                ApiError::new(ErrorCode::ConfigError)
            }
            TouchlineError::Internal(msg) => {
                error!("Internal error: {}", msg);
                ApiError::internal_error()
            }
        }
    }
}
