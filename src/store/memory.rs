//! In-process store.
//!
//! Holds videos (each embedding its license) and notifications behind one
//! `RwLock`, so every operation is atomic with respect to the others.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ExpiringLicense, NotificationStore, VideoStore};
use crate::errors::{TouchlineError, TouchlineResult};
use crate::license::{classify_expiration, LicenseStatus, VideoLicense};
use crate::notification::{NewNotification, Notification, NotificationStatus};
use crate::video::{
    normalize_territories, LicenseUpdate, NewVideo, VideoContent, VideoUpdate,
};

#[derive(Debug, Default)]
struct State {
    videos: Vec<VideoContent>,
    notifications: Vec<Notification>,
}

/// Store backed by process memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut videos: Vec<VideoContent>) -> Vec<VideoContent> {
    videos.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
    videos
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn find_all(&self) -> TouchlineResult<Vec<VideoContent>> {
        let state = self.state.read().await;
        Ok(sorted(state.videos.clone()))
    }

    async fn find_by_status(
        &self,
        status: LicenseStatus,
        now: NaiveDateTime,
        threshold_days: u32,
    ) -> TouchlineResult<Vec<VideoContent>> {
        let state = self.state.read().await;
        let matching = state
            .videos
            .iter()
            .filter(|v| classify_expiration(v.license.expiration_date, now, threshold_days) == status)
            .cloned()
            .collect();
        Ok(sorted(matching))
    }

    async fn find_by_territory_exclusion(
        &self,
        territory: &str,
    ) -> TouchlineResult<Vec<VideoContent>> {
        let state = self.state.read().await;
        let matching = state
            .videos
            .iter()
            .filter(|v| !v.license.is_restricted_in(territory))
            .cloned()
            .collect();
        Ok(sorted(matching))
    }

    async fn find_by_id(&self, id: &str) -> TouchlineResult<VideoContent> {
        let state = self.state.read().await;
        state
            .videos
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| TouchlineError::video_not_found(id))
    }

    async fn find_license(&self, video_id: &str) -> TouchlineResult<VideoLicense> {
        let state = self.state.read().await;
        state
            .videos
            .iter()
            .find(|v| v.id == video_id)
            .map(|v| v.license.clone())
            .ok_or_else(|| TouchlineError::license_not_found(video_id))
    }

    async fn create(&self, new: NewVideo) -> TouchlineResult<VideoContent> {
        let video_id = Uuid::new_v4().to_string();
        let video = VideoContent {
            id: video_id.clone(),
            url: new.url,
            title: new.title,
            creator: new.creator,
            created_date: new.created_date,
            duration: new.duration,
            attribution: new.attribution,
            thumbnail_url: new.thumbnail_url,
            tags: new.tags,
            license: VideoLicense {
                id: Uuid::new_v4().to_string(),
                video_id,
                license_type: new.license.license_type,
                start_date: new.license.start_date,
                expiration_date: new.license.expiration_date,
                terms: new.license.terms,
                restrictions: new.license.restrictions,
                territory_restrictions: normalize_territories(new.license.territory_restrictions),
                renewal_terms: new.license.renewal_terms,
            },
        };

        self.state.write().await.videos.push(video.clone());
        Ok(video)
    }

    async fn update_video(&self, id: &str, update: VideoUpdate) -> TouchlineResult<VideoContent> {
        let mut state = self.state.write().await;
        let video = state
            .videos
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| TouchlineError::video_not_found(id))?;
        update.apply_to(video);
        Ok(video.clone())
    }

    async fn update_license(
        &self,
        video_id: &str,
        update: LicenseUpdate,
    ) -> TouchlineResult<VideoLicense> {
        let mut state = self.state.write().await;
        let video = state
            .videos
            .iter_mut()
            .find(|v| v.id == video_id)
            .ok_or_else(|| TouchlineError::license_not_found(video_id))?;
        update.apply_to(&mut video.license)?;
        Ok(video.license.clone())
    }

    async fn delete(&self, id: &str) -> TouchlineResult<()> {
        let mut state = self.state.write().await;
        let before = state.videos.len();
        state.videos.retain(|v| v.id != id);
        if state.videos.len() == before {
            return Err(TouchlineError::video_not_found(id));
        }
        Ok(())
    }

    async fn find_expiring_licenses(
        &self,
        now: NaiveDateTime,
        until: NaiveDateTime,
    ) -> TouchlineResult<Vec<ExpiringLicense>> {
        let state = self.state.read().await;
        let mut expiring: Vec<ExpiringLicense> = state
            .videos
            .iter()
            .filter(|v| {
                v.license
                    .expiration_date
                    .is_some_and(|expires| expires > now && expires < until)
            })
            .map(|v| ExpiringLicense {
                video_title: v.title.clone(),
                license: v.license.clone(),
            })
            .collect();
        // Same order as the SQL store: expiration date, then video id.
        expiring.sort_by(|a, b| {
            (a.license.expiration_date, &a.license.video_id)
                .cmp(&(b.license.expiration_date, &b.license.video_id))
        });
        Ok(expiring)
    }

    async fn ping(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create_notification(
        &self,
        new: NewNotification,
        created_at: NaiveDateTime,
    ) -> TouchlineResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            notification_type: new.notification_type,
            title: new.title,
            message: new.message,
            status: NotificationStatus::Unread,
            metadata: new.metadata,
            created_at,
        };
        self.state
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        status: Option<NotificationStatus>,
    ) -> TouchlineResult<Vec<Notification>> {
        let state = self.state.read().await;
        let mut out: Vec<Notification> = state
            .notifications
            .iter()
            .rev()
            .filter(|n| status.map_or(true, |s| n.status == s))
            .cloned()
            .collect();
        // Stable sort keeps newest-inserted first among equal timestamps.
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn mark_notification_read(&self, id: &str) -> TouchlineResult<Notification> {
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| TouchlineError::notification_not_found(id))?;
        notification.status = NotificationStatus::Read;
        Ok(notification.clone())
    }

    async fn delete_notification(&self, id: &str) -> TouchlineResult<()> {
        let mut state = self.state.write().await;
        let before = state.notifications.len();
        state.notifications.retain(|n| n.id != id);
        if state.notifications.len() == before {
            return Err(TouchlineError::notification_not_found(id));
        }
        Ok(())
    }

    async fn unread_count(&self) -> TouchlineResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.status == NotificationStatus::Unread)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::LicenseType;
    use crate::video::NewLicense;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn new_video(title: &str, expires_in_days: Option<i64>, territories: &[&str]) -> NewVideo {
        NewVideo {
            url: "https://youtu.be/xyz".to_string(),
            title: title.to_string(),
            creator: "Coach".to_string(),
            created_date: now(),
            duration: "2:00".to_string(),
            attribution: "Coach".to_string(),
            thumbnail_url: None,
            tags: vec![],
            license: NewLicense {
                license_type: LicenseType::Licensed,
                start_date: now() - Duration::days(30),
                expiration_date: expires_in_days.map(|d| now() + Duration::days(d)),
                terms: vec![],
                restrictions: vec![],
                territory_restrictions: territories.iter().map(|t| t.to_string()).collect(),
                renewal_terms: None,
            },
        }
    }

    #[tokio::test]
    async fn expiring_licenses_are_ordered_by_expiration() {
        let store = MemoryStore::new();
        store.create(new_video("Twenty", Some(20), &[])).await.unwrap();
        store.create(new_video("Five", Some(5), &[])).await.unwrap();
        store.create(new_video("Twelve", Some(12), &[])).await.unwrap();

        let expiring = store
            .find_expiring_licenses(now(), now() + Duration::days(30))
            .await
            .unwrap();
        let titles: Vec<_> = expiring.iter().map(|e| e.video_title.as_str()).collect();
        assert_eq!(titles, vec!["Five", "Twelve", "Twenty"]);
    }

    #[tokio::test]
    async fn license_update_rejects_expiration_before_start() {
        let store = MemoryStore::new();
        let created = store.create(new_video("Rondo", Some(10), &[])).await.unwrap();

        let err = store
            .update_license(
                &created.id,
                LicenseUpdate {
                    expiration_date: Some(Some(now() - Duration::days(60))),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TouchlineError::Validation { .. }));

        let license = store.find_license(&created.id).await.unwrap();
        assert_eq!(license, created.license);
    }

    #[tokio::test]
    async fn status_queries_partition_videos() {
        let store = MemoryStore::new();
        store.create(new_video("a", None, &[])).await.unwrap();
        store.create(new_video("b", Some(-1), &[])).await.unwrap();
        store.create(new_video("c", Some(10), &[])).await.unwrap();
        store.create(new_video("d", Some(60), &[])).await.unwrap();

        let titles = |v: Vec<VideoContent>| v.into_iter().map(|v| v.title).collect::<Vec<_>>();
        let active = store.find_by_status(LicenseStatus::Active, now(), 30).await.unwrap();
        let expired = store.find_by_status(LicenseStatus::Expired, now(), 30).await.unwrap();
        let soon = store
            .find_by_status(LicenseStatus::ExpiringSoon, now(), 30)
            .await
            .unwrap();

        assert_eq!(titles(active), vec!["a", "d"]);
        assert_eq!(titles(expired), vec!["b"]);
        assert_eq!(titles(soon), vec!["c"]);
    }

    #[tokio::test]
    async fn territory_exclusion_uses_membership() {
        let store = MemoryStore::new();
        store.create(new_video("multi", None, &["US", "CA"])).await.unwrap();
        store.create(new_video("single", None, &["FR"])).await.unwrap();
        store.create(new_video("open", None, &[])).await.unwrap();

        let visible: Vec<String> = store
            .find_by_territory_exclusion("CA")
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.title)
            .collect();
        assert_eq!(visible, vec!["open", "single"]);
    }

    #[tokio::test]
    async fn delete_removes_video_and_license() {
        let store = MemoryStore::new();
        let video = store.create(new_video("a", None, &[])).await.unwrap();

        store.delete(&video.id).await.unwrap();

        assert!(store.find_by_id(&video.id).await.unwrap_err().is_not_found());
        assert!(store.find_license(&video.id).await.unwrap_err().is_not_found());
        assert!(store.delete(&video.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn notifications_can_be_read_and_deleted() {
        let store = MemoryStore::new();
        let n = store
            .create_notification(
                NewNotification {
                    notification_type: crate::notification::NotificationType::LicenseExpiring,
                    title: "t".to_string(),
                    message: "m".to_string(),
                    metadata: serde_json::json!({}),
                },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(store.unread_count().await.unwrap(), 1);

        let read = store.mark_notification_read(&n.id).await.unwrap();
        assert_eq!(read.status, NotificationStatus::Read);
        assert_eq!(store.unread_count().await.unwrap(), 0);

        store.delete_notification(&n.id).await.unwrap();
        assert!(store.list_notifications(None).await.unwrap().is_empty());
        assert!(store
            .mark_notification_read(&n.id)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
