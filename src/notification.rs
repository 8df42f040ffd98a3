//! Admin notifications produced by the expiring-license sweep.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::license::VideoLicense;

/// Kind of event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    LicenseExpiring,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LicenseExpiring => "LICENSE_EXPIRING",
        }
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LICENSE_EXPIRING" => Ok(NotificationType::LicenseExpiring),
            other => Err(format!("unknown notification type '{other}'")),
        }
    }
}

/// Read state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Read,
    Unread,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Read => "READ",
            NotificationStatus::Unread => "UNREAD",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READ" => Ok(NotificationStatus::Read),
            "UNREAD" => Ok(NotificationStatus::Unread),
            other => Err(format!(
                "unknown notification status '{other}' (expected READ or UNREAD)"
            )),
        }
    }
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub metadata: serde_json::Value,
    pub created_at: NaiveDateTime,
}

/// A notification before the store assigns an id and creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

/// Render a date the way admins read it, e.g. `February 10, 2024`.
pub fn human_date(at: NaiveDateTime) -> String {
    at.format("%B %-d, %Y").to_string()
}

impl NewNotification {
    /// The `LICENSE_EXPIRING` notice for one license about to lapse.
    ///
    /// Perpetual licenses never reach the sweep; if one does, the message
    /// says so instead of inventing a date.
    pub fn license_expiring(video_title: &str, license: &VideoLicense) -> Self {
        let when = license
            .expiration_date
            .map(human_date)
            .unwrap_or_else(|| "an unknown date".to_string());

        NewNotification {
            notification_type: NotificationType::LicenseExpiring,
            title: format!("License Expiring: {video_title}"),
            message: format!(
                "The license for video \"{video_title}\" will expire on {when}. Please review and take necessary action."
            ),
            metadata: serde_json::json!({
                "videoId": license.video_id,
                "licenseId": license.id,
                "expirationDate": license.expiration_date,
            }),
        }
    }
}
