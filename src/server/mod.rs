//! Server-side components for Touchline.
//!
//! This module contains:
//! - `database`      → `VideoStore` / `NotificationStore` over SQLite or Postgres
//! - `handlers`      → shared `AppState` and the health check
//! - `videos`        → catalog endpoints
//! - `notifications` → notification inbox endpoints
//! - `cron`          → secret-protected sweep trigger
//! - `routes`        → router builder
//! - `api_error`     → standardized error responses
//! - `logging`       → request logging middleware and audit events
//! - `validation`    → request validation utilities

pub mod api_error;
pub mod cron;
pub mod database;
pub mod handlers;
pub mod logging;
pub mod notifications;
pub mod routes;
pub mod validation;
pub mod videos;

pub use api_error::{ApiError, ErrorCode};
pub use database::Database;
pub use handlers::{health_handler, AppState};
pub use routes::build_router;

pub use validation::{
    parse_datetime, parse_license_type, validate_length, validate_not_empty,
    validate_territory_code, validate_url, ValidationError, ValidationResult, Validator,
};
