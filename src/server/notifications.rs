//! Notification inbox endpoints.
//!
//! - `GET /api/notifications?status=READ|UNREAD` - List, newest first
//! - `GET /api/notifications/unread-count` - Number of unread notifications
//! - `POST /api/notifications/:id/read` - Mark one notification read
//! - `DELETE /api/notifications/:id` - Delete one notification

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::notification::{Notification, NotificationStatus};
use crate::server::api_error::ApiError;
use crate::server::handlers::AppState;
use crate::server::logging::{log_video_event, VideoEvent};
use crate::server::validation::ValidationError;

#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// `GET /api/notifications?status={READ|UNREAD}`
pub async fn list_notifications_handler(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<NotificationStatus>().map_err(|msg| {
            ApiError::validation(vec![ValidationError::new("status", msg)])
        })?),
    };

    Ok(Json(state.store.list_notifications(status).await?))
}

/// `GET /api/notifications/unread-count`
pub async fn unread_count_handler(
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = state.store.unread_count().await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// `POST /api/notifications/:id/read`
pub async fn mark_read_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state.store.mark_notification_read(&id).await?;
    log_video_event(VideoEvent::NotificationRead, &id, None);
    Ok(Json(notification))
}

/// `DELETE /api/notifications/:id`
pub async fn delete_notification_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_notification(&id).await?;
    log_video_event(VideoEvent::NotificationDeleted, &id, None);
    Ok(StatusCode::NO_CONTENT)
}
