//! Expiring-license sweep.
//!
//! Finds licenses that expire strictly between `now` and
//! `now + threshold_days` and records one `LICENSE_EXPIRING` notification per
//! license. The sweep keeps no record of earlier runs, so running it twice
//! inside the same window notifies twice.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::license::expiring_window_end;
use crate::notification::NewNotification;
use crate::store::{NotificationStore, VideoStore};

use super::JobError;

/// Run the sweep at `now` and return how many notifications were created.
///
/// Stops at the first failed notification write and returns that error.
pub async fn run_expiring_license_sweep<S>(
    store: &S,
    now: NaiveDateTime,
    threshold_days: u32,
) -> Result<u32, JobError>
where
    S: VideoStore + NotificationStore + ?Sized,
{
    let until = expiring_window_end(now, threshold_days);

    debug!(
        "Checking for licenses expiring between {} and {} ({} days)",
        now, until, threshold_days
    );

    let expiring = store.find_expiring_licenses(now, until).await?;

    let mut count = 0;

    for item in expiring {
        debug!(
            "License {} for video {} expires at {:?}",
            item.license.id, item.license.video_id, item.license.expiration_date
        );

        let notice = NewNotification::license_expiring(&item.video_title, &item.license);
        store.create_notification(notice, now).await?;

        count += 1;
        info!(
            "Queued expiry notification for license {} (video \"{}\")",
            item.license.id, item.video_title
        );
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::LicenseType;
    use crate::notification::{NotificationStatus, NotificationType};
    use crate::store::MemoryStore;
    use crate::video::{NewLicense, NewVideo};
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    async fn seed(store: &MemoryStore, title: &str, expires_in_days: Option<i64>) {
        store
            .create(NewVideo {
                url: "https://youtu.be/seed".to_string(),
                title: title.to_string(),
                creator: "Coach".to_string(),
                created_date: now(),
                duration: "1:00".to_string(),
                attribution: "Coach".to_string(),
                thumbnail_url: None,
                tags: vec![],
                license: NewLicense {
                    license_type: LicenseType::Licensed,
                    start_date: now() - Duration::days(100),
                    expiration_date: expires_in_days.map(|d| now() + Duration::days(d)),
                    terms: vec![],
                    restrictions: vec![],
                    territory_restrictions: vec![],
                    renewal_terms: None,
                },
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sweep_notifies_only_licenses_inside_window() {
        let store = MemoryStore::new();
        seed(&store, "Expired drill", Some(-1)).await;
        seed(&store, "Soon drill", Some(10)).await;
        seed(&store, "Later drill", Some(60)).await;
        seed(&store, "Forever drill", None).await;

        let created = run_expiring_license_sweep(&store, now(), 30).await.unwrap();
        assert_eq!(created, 1);

        let notifications = store.list_notifications(None).await.unwrap();
        assert_eq!(notifications.len(), 1);
        let n = &notifications[0];
        assert_eq!(n.notification_type, NotificationType::LicenseExpiring);
        assert_eq!(n.status, NotificationStatus::Unread);
        assert_eq!(n.title, "License Expiring: Soon drill");
        assert_eq!(n.created_at, now());
    }

    #[tokio::test]
    async fn sweep_with_empty_store_creates_nothing() {
        let store = MemoryStore::new();
        assert_eq!(run_expiring_license_sweep(&store, now(), 30).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn repeated_sweeps_notify_again() {
        let store = MemoryStore::new();
        seed(&store, "Soon drill", Some(5)).await;

        run_expiring_license_sweep(&store, now(), 30).await.unwrap();
        run_expiring_license_sweep(&store, now(), 30).await.unwrap();

        assert_eq!(store.unread_count().await.unwrap(), 2);
    }
}
