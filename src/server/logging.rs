//! Request logging middleware and audit events for Touchline.
//!
//! Every request gets a unique id, a tracing span, timing, and an
//! `X-Request-Id` response header. Changes to videos, licenses and
//! notifications are logged through [`log_video_event`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use axum::middleware;
//! use touchline::server::logging::request_logging_middleware;
//!
//! let app = build_router(state).layer(middleware::from_fn(request_logging_middleware));
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Catalog and inbox change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    /// Video and license were created
    Created,
    /// Video fields were updated
    Updated,
    /// License fields were updated
    LicenseUpdated,
    /// Video and license were deleted
    Deleted,
    /// Playback was refused for a viewer territory
    PlaybackBlocked,
    /// An expiring-license notification was read
    NotificationRead,
    /// An expiring-license notification was deleted
    NotificationDeleted,
}

impl std::fmt::Display for VideoEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VideoEvent::Created => "created",
            VideoEvent::Updated => "updated",
            VideoEvent::LicenseUpdated => "license_updated",
            VideoEvent::Deleted => "deleted",
            VideoEvent::PlaybackBlocked => "playback_blocked",
            VideoEvent::NotificationRead => "notification_read",
            VideoEvent::NotificationDeleted => "notification_deleted",
        };
        write!(f, "{}", s)
    }
}

/// Log a catalog or inbox change.
///
/// * `event` - what happened
/// * `id` - the video id (or notification id for inbox events)
/// * `details` - optional free-form context
pub fn log_video_event(event: VideoEvent, id: &str, details: Option<&str>) {
    let span = info_span!(
        "video_event",
        event = %event,
        id = %id,
    );
    let _enter = span.enter();

    match event {
        VideoEvent::PlaybackBlocked => {
            if let Some(d) = details {
                warn!(reason = %d, "Video event occurred");
            } else {
                warn!("Video event occurred");
            }
        }
        _ => {
            if let Some(d) = details {
                info!(details = %d, "Video event occurred");
            } else {
                info!("Video event occurred");
            }
        }
    }
}

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logging middleware that tracks request timing and generates request IDs.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();

    let response = async move {
        info!("Started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();

    let _enter = span.enter();
    if status.is_client_error() {
        warn!(
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request rejected"
        );
    } else {
        info!(
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    Response::from_parts(parts, body)
}

/// Health check response structure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: DatabaseHealth,
}

/// Store health status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    /// sqlite, postgres or memory
    pub db_type: String,
}

impl HealthResponse {
    pub fn healthy(db_connected: bool, db_type: &str) -> Self {
        Self {
            status: if db_connected { "healthy" } else { "degraded" }.to_string(),
            service: "touchline".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_connected,
                db_type: db_type.to_string(),
            },
        }
    }
}
