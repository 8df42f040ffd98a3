//! Crate-wide error type.

use thiserror::Error;

/// Errors produced by the store, the classifier surface and configuration.
#[derive(Debug, Error)]
pub enum TouchlineError {
    /// A referenced video, license or notification does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A record would be left in an inconsistent state.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Any failure reported by the persistence layer.
    #[error("database error: {0}")]
    DatabaseError(String),

    /// Caller presented missing or wrong credentials.
    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl TouchlineError {
    /// Shorthand for a missing video.
    pub fn video_not_found(id: impl Into<String>) -> Self {
        TouchlineError::NotFound {
            entity: "video",
            id: id.into(),
        }
    }

    /// Shorthand for a missing license.
    pub fn license_not_found(id: impl Into<String>) -> Self {
        TouchlineError::NotFound {
            entity: "license",
            id: id.into(),
        }
    }

    /// Shorthand for a missing notification.
    pub fn notification_not_found(id: impl Into<String>) -> Self {
        TouchlineError::NotFound {
            entity: "notification",
            id: id.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        TouchlineError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TouchlineError::NotFound { .. })
    }
}

/// Result alias used across the crate.
pub type TouchlineResult<T> = Result<T, TouchlineError>;

impl From<serde_json::Error> for TouchlineError {
    fn from(err: serde_json::Error) -> Self {
        TouchlineError::Internal(format!("json error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_entity_and_id() {
        let err = TouchlineError::video_not_found("abc");
        assert_eq!(err.to_string(), "video not found: abc");
        assert!(err.is_not_found());
    }

    #[test]
    fn validation_display_names_field() {
        let err = TouchlineError::validation("expirationDate", "must not be before startDate");
        assert_eq!(
            err.to_string(),
            "invalid expirationDate: must not be before startDate"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn database_error_is_not_not_found() {
        let err = TouchlineError::DatabaseError("boom".to_string());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("boom"));
    }
}
