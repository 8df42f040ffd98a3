use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower::ServiceBuilder;

use crate::server::cron::check_licenses_handler;
use crate::server::handlers::{health_handler, AppState};
use crate::server::logging::request_logging_middleware;
use crate::server::notifications::{
    delete_notification_handler, list_notifications_handler, mark_read_handler,
    unread_count_handler,
};
use crate::server::videos::{
    create_video_handler, delete_video_handler, get_video_handler, license_alerts_handler,
    list_videos_handler, player_handler, update_license_handler, update_video_handler,
};

/// Build the application router.
///
/// # Routes
///
/// ## Catalog
/// - `GET /api/videos` - List videos (`?status=` or `?territory=`)
/// - `POST /api/videos` - Create a video with its license
/// - `GET /api/videos/alerts` - License alerts
/// - `GET /api/videos/:id` - Get a video
/// - `PATCH /api/videos/:id` - Update video fields
/// - `DELETE /api/videos/:id` - Delete a video and its license
/// - `PATCH /api/videos/:id/license` - Update license fields
/// - `GET /api/videos/:id/player` - Player view (`?territory=`)
///
/// ## Notifications
/// - `GET /api/notifications` - List (`?status=READ|UNREAD`)
/// - `GET /api/notifications/unread-count` - Unread count
/// - `POST /api/notifications/:id/read` - Mark read
/// - `DELETE /api/notifications/:id` - Delete
///
/// ## Operations
/// - `GET /api/cron/check-licenses` - Expiring-license sweep (Bearer secret)
/// - `GET /health` - Health check
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/videos",
            get(list_videos_handler).post(create_video_handler),
        )
        .route("/api/videos/alerts", get(license_alerts_handler))
        .route(
            "/api/videos/:id",
            get(get_video_handler)
                .patch(update_video_handler)
                .delete(delete_video_handler),
        )
        .route(
            "/api/videos/:id/license",
            patch(update_license_handler),
        )
        .route("/api/videos/:id/player", get(player_handler))
        .route("/api/notifications", get(list_notifications_handler))
        .route(
            "/api/notifications/unread-count",
            get(unread_count_handler),
        )
        .route("/api/notifications/:id/read", post(mark_read_handler))
        .route(
            "/api/notifications/:id",
            delete(delete_notification_handler),
        )
        .route("/api/cron/check-licenses", get(check_licenses_handler))
        .route("/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(middleware::from_fn(request_logging_middleware)))
        .with_state(state)
}
