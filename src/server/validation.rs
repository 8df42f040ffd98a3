//! Request validation utilities for the Touchline API.
//!
//! Validators return a [`ValidationError`] naming the offending field.
//! Handlers gather them with [`Validator`] so a single 400 response can list
//! every problem in the payload.

use std::fmt;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

use crate::license::LicenseType;

/// Validation error type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Accumulates field errors across a whole payload.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the error, if any, and hand back the value.
    pub fn check<T>(&mut self, result: ValidationResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("static URL pattern"))
}

fn territory_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]{2,3}$").expect("static territory pattern"))
}

/// Validate an absolute http(s) URL.
///
/// # Example
/// ```
/// use touchline::server::validation::validate_url;
///
/// assert!(validate_url("https://youtu.be/dQw4w9WgXcQ", "url").is_ok());
/// assert!(validate_url("not a url", "url").is_err());
/// ```
pub fn validate_url(value: &str, field_name: &str) -> ValidationResult<()> {
    if url_regex().is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field_name,
            "must be a valid http(s) URL",
        ))
    }
}

/// Validate that a string is not empty or whitespace only.
///
/// # Example
/// ```
/// use touchline::server::validation::validate_not_empty;
///
/// assert!(validate_not_empty("hello", "title").is_ok());
/// assert!(validate_not_empty("   ", "title").is_err());
/// ```
pub fn validate_not_empty(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field_name, "cannot be empty"))
    } else {
        Ok(())
    }
}

/// Validate string length is within bounds.
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field_name: &str,
) -> ValidationResult<()> {
    let len = value.chars().count();
    if len < min {
        Err(ValidationError::new(
            field_name,
            format!("must be at least {} characters", min),
        ))
    } else if len > max {
        Err(ValidationError::new(
            field_name,
            format!("must be at most {} characters", max),
        ))
    } else {
        Ok(())
    }
}

/// Validate a territory code (two or three letters, e.g. `US`, `GBR`).
pub fn validate_territory_code(value: &str, field_name: &str) -> ValidationResult<()> {
    if territory_regex().is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field_name,
            format!("invalid territory code '{value}' (expected 2-3 letters)"),
        ))
    }
}

/// Validate every territory code in a list, reporting the first bad one.
pub fn validate_territory_codes(values: &[String], field_name: &str) -> ValidationResult<()> {
    values
        .iter()
        .try_for_each(|code| validate_territory_code(code, field_name))
}

/// Parse an ISO 8601 datetime string into a UTC `NaiveDateTime`.
///
/// Accepts formats:
/// - RFC 3339: `2025-12-31T23:59:59Z` (converted to UTC)
/// - Without timezone: `2025-12-31T23:59:59`, optionally with fractional seconds
/// - Date only: `2025-12-31` (midnight)
pub fn parse_datetime(value: &str, field_name: &str) -> ValidationResult<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt);
    }

    if let Some(dt) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(dt);
    }

    Err(ValidationError::new(
        field_name,
        "invalid datetime format (expected: ISO 8601, e.g., '2025-12-31T23:59:59Z' or '2025-12-31')",
    ))
}

/// Parse a license type (`own`, `licensed`, `creative-commons`, `partnership`).
pub fn parse_license_type(value: &str, field_name: &str) -> ValidationResult<LicenseType> {
    value
        .parse::<LicenseType>()
        .map_err(|msg| ValidationError::new(field_name, msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://www.youtube.com/watch?v=abc", "url").is_ok());
        assert!(validate_url("http://example.com/video.mp4", "url").is_ok());
        assert!(validate_url("ftp://example.com/video.mp4", "url").is_err());
        assert!(validate_url("example.com", "url").is_err());
        assert!(validate_url("", "url").is_err());
        assert!(validate_url("https://exa mple.com", "url").is_err());
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("Rondo", "title").is_ok());
        assert!(validate_not_empty("", "title").is_err());
        assert!(validate_not_empty("\t\n", "title").is_err());
    }

    #[test]
    fn test_validate_length_counts_chars() {
        assert!(validate_length("héllo", 1, 5, "title").is_ok());
        assert!(validate_length("", 1, 5, "title").is_err());
        assert!(validate_length("toolong", 1, 5, "title").is_err());
    }

    #[test]
    fn test_validate_territory_code() {
        assert!(validate_territory_code("US", "t").is_ok());
        assert!(validate_territory_code("gbr", "t").is_ok());
        assert!(validate_territory_code("U", "t").is_err());
        assert!(validate_territory_code("U1", "t").is_err());
        assert!(validate_territory_codes(&["US".into(), "12".into()], "t").is_err());
    }

    #[test]
    fn test_parse_datetime() {
        let midnight = NaiveDate::from_ymd_opt(2025, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2025-12-31", "d").unwrap(), midnight);
        assert_eq!(
            parse_datetime("2025-12-31T02:00:00+02:00", "d").unwrap(),
            midnight
        );
        assert_eq!(
            parse_datetime("2025-12-31T00:00:00.000Z", "d").unwrap(),
            midnight
        );
        assert_eq!(parse_datetime("2025-12-31T00:00:00", "d").unwrap(), midnight);
        assert!(parse_datetime("31-12-2025", "d").is_err());
        assert!(parse_datetime("soon", "d").is_err());
    }

    #[test]
    fn test_parse_license_type() {
        assert_eq!(
            parse_license_type("creative-commons", "type").unwrap(),
            LicenseType::CreativeCommons
        );
        let err = parse_license_type("borrowed", "license.type").unwrap_err();
        assert_eq!(err.field, "license.type");
    }

    #[test]
    fn test_validator_collects_all_errors() {
        let mut v = Validator::new();
        assert!(v.check(validate_url("nope", "url")).is_none());
        assert!(v.check(validate_not_empty("", "title")).is_none());
        assert!(v.check(parse_datetime("2025-01-01", "createdDate")).is_some());

        let errors = v.finish().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["url", "title"]);
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("url", "is invalid");
        assert_eq!(err.to_string(), "url: is invalid");
    }
}
