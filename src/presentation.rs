//! View models that map license state onto what the site shows.
//!
//! The dashboard colours each license with a badge, lists alerts for every
//! license that is not active, and the drill player either embeds the video
//! or shows an unavailable notice.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

use crate::license::{is_available, LicenseStatus, LicenseType};
use crate::video::VideoContent;

/// Shown instead of the player when a video cannot be played.
pub const UNAVAILABLE_MESSAGE: &str =
    "This video is currently unavailable in your region or the license has expired.";

/// Shown under Creative Commons videos.
pub const CREATIVE_COMMONS_NOTICE: &str =
    "Licensed under Creative Commons. See terms for attribution requirements.";

/// Colour family of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTone {
    Green,
    Red,
    Yellow,
}

impl BadgeTone {
    /// Utility classes used by the dashboard for this tone.
    pub fn css_classes(&self) -> &'static str {
        match self {
            BadgeTone::Green => "text-green-600 bg-green-50",
            BadgeTone::Red => "text-red-600 bg-red-50",
            BadgeTone::Yellow => "text-yellow-600 bg-yellow-50",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBadge {
    pub label: &'static str,
    pub tone: BadgeTone,
    pub class_name: &'static str,
}

impl LicenseStatus {
    pub fn badge(&self) -> StatusBadge {
        let (label, tone) = match self {
            LicenseStatus::Active => ("Active License", BadgeTone::Green),
            LicenseStatus::Expired => ("License Expired", BadgeTone::Red),
            LicenseStatus::ExpiringSoon => ("License Expiring Soon", BadgeTone::Yellow),
        };
        StatusBadge {
            label,
            tone,
            class_name: tone.css_classes(),
        }
    }

    /// Alert text for the dashboard, `None` for active licenses.
    pub fn alert_message(&self) -> Option<&'static str> {
        match self {
            LicenseStatus::Active => None,
            LicenseStatus::Expired => Some("License has expired"),
            LicenseStatus::ExpiringSoon => Some("License expiring soon"),
        }
    }
}

/// One entry of the dashboard's license alert list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseAlert {
    pub video_id: String,
    pub title: String,
    pub status: LicenseStatus,
    pub message: &'static str,
    pub expiration_date: Option<NaiveDateTime>,
}

/// Alerts for every video whose license is expired or expiring soon.
pub fn license_alerts(
    videos: &[VideoContent],
    now: NaiveDateTime,
    threshold_days: u32,
) -> Vec<LicenseAlert> {
    videos
        .iter()
        .filter_map(|video| {
            let status = video.license.status(now, threshold_days);
            status.alert_message().map(|message| LicenseAlert {
                video_id: video.id.clone(),
                title: video.title.clone(),
                status,
                message,
                expiration_date: video.license.expiration_date,
            })
        })
        .collect()
}

/// What the drill player should render for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub video_id: String,
    pub title: String,
    pub territory: String,
    pub playable: bool,
    pub status: LicenseStatus,
    pub badge: StatusBadge,
    pub has_territory_restrictions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    pub attribution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution_notice: Option<&'static str>,
}

pub fn player_view(
    video: &VideoContent,
    territory: &str,
    now: NaiveDateTime,
    threshold_days: u32,
) -> PlayerView {
    let status = video.license.status(now, threshold_days);
    let playable = is_available(&video.license, territory, now);

    PlayerView {
        video_id: video.id.clone(),
        title: video.title.clone(),
        territory: crate::license::normalize_territory(territory),
        playable,
        status,
        badge: status.badge(),
        has_territory_restrictions: video.license.has_territory_restrictions(),
        unavailable_message: (!playable).then_some(UNAVAILABLE_MESSAGE),
        // No embed for unplayable videos.
        embed_url: if playable { embed_url(&video.url) } else { None },
        attribution: video.attribution.clone(),
        attribution_notice: (video.license.license_type == LicenseType::CreativeCommons)
            .then_some(CREATIVE_COMMONS_NOTICE),
    }
}

fn youtube_id_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:youtu\.be/|youtube\.com/(?:embed/|v/|watch\?v=|watch\?.+&v=))([^&?]+)").ok()
    })
    .as_ref()
}

/// Embed URL for a YouTube link, `None` for anything else.
pub fn embed_url(url: &str) -> Option<String> {
    let id = youtube_id_regex()?.captures(url)?.get(1)?.as_str();
    Some(format!("https://www.youtube.com/embed/{id}"))
}
