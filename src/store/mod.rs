//! Repository interfaces over videos, licenses and notifications.
//!
//! The HTTP layer and the sweep only talk to these traits. Two
//! implementations ship with the crate:
//! - `server::database::Database` → SQLite / PostgreSQL via sqlx
//! - [`MemoryStore`] → in-process store for tests and database-less runs
//!
//! Queries that depend on the current time take `now` as an argument; the
//! store never reads the clock itself.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::errors::TouchlineResult;
use crate::license::{LicenseStatus, VideoLicense};
use crate::notification::{NewNotification, Notification, NotificationStatus};
use crate::video::{LicenseUpdate, NewVideo, VideoContent, VideoFilter, VideoUpdate};

mod memory;

pub use memory::MemoryStore;

/// A license selected by the expiring-license query, with its video title.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiringLicense {
    pub video_title: String,
    pub license: VideoLicense,
}

/// Videos and their one-to-one licenses.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// All videos, ordered by title.
    async fn find_all(&self) -> TouchlineResult<Vec<VideoContent>>;

    /// Videos whose license has `status` at `now`. The three statuses are
    /// disjoint and together cover every video.
    async fn find_by_status(
        &self,
        status: LicenseStatus,
        now: NaiveDateTime,
        threshold_days: u32,
    ) -> TouchlineResult<Vec<VideoContent>>;

    /// Videos whose territory restrictions do NOT contain `territory`.
    async fn find_by_territory_exclusion(
        &self,
        territory: &str,
    ) -> TouchlineResult<Vec<VideoContent>>;

    /// A single video. Missing ids yield `TouchlineError::NotFound`.
    async fn find_by_id(&self, id: &str) -> TouchlineResult<VideoContent>;

    /// The license owned by a video. Missing ids yield `NotFound`.
    async fn find_license(&self, video_id: &str) -> TouchlineResult<VideoLicense>;

    /// Create a video and its license atomically.
    async fn create(&self, video: NewVideo) -> TouchlineResult<VideoContent>;

    async fn update_video(&self, id: &str, update: VideoUpdate) -> TouchlineResult<VideoContent>;

    async fn update_license(
        &self,
        video_id: &str,
        update: LicenseUpdate,
    ) -> TouchlineResult<VideoLicense>;

    /// Delete a video together with its license atomically.
    async fn delete(&self, id: &str) -> TouchlineResult<()>;

    /// Licenses expiring strictly between `now` and `until`.
    async fn find_expiring_licenses(
        &self,
        now: NaiveDateTime,
        until: NaiveDateTime,
    ) -> TouchlineResult<Vec<ExpiringLicense>>;

    /// Whether the backing store is reachable.
    async fn ping(&self) -> bool;

    /// Short backend name for health output.
    fn backend_name(&self) -> &'static str;
}

/// Admin notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(
        &self,
        notification: NewNotification,
        created_at: NaiveDateTime,
    ) -> TouchlineResult<Notification>;

    /// Newest first, optionally restricted to one status.
    async fn list_notifications(
        &self,
        status: Option<NotificationStatus>,
    ) -> TouchlineResult<Vec<Notification>>;

    async fn mark_notification_read(&self, id: &str) -> TouchlineResult<Notification>;

    async fn delete_notification(&self, id: &str) -> TouchlineResult<()>;

    async fn unread_count(&self) -> TouchlineResult<u64>;
}

/// Everything the service needs from persistence.
pub trait Store: VideoStore + NotificationStore {}

impl<T: VideoStore + NotificationStore + ?Sized> Store for T {}

/// Run the video query facade for `filter`.
pub async fn list_videos<S: VideoStore + ?Sized>(
    store: &S,
    filter: &VideoFilter,
    now: NaiveDateTime,
    threshold_days: u32,
) -> TouchlineResult<Vec<VideoContent>> {
    match filter {
        VideoFilter::All => store.find_all().await,
        VideoFilter::Status(status) => store.find_by_status(*status, now, threshold_days).await,
        VideoFilter::TerritoryExclusion(code) => store.find_by_territory_exclusion(code).await,
    }
}
