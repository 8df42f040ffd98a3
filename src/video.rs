//! Video content records and the inputs used to create and update them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::TouchlineResult;
use crate::license::{normalize_territory, LicenseStatus, LicenseType, VideoLicense};

/// A training-drill video together with its license.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContent {
    pub id: String,
    pub url: String,
    pub title: String,
    pub creator: String,
    pub created_date: NaiveDateTime,
    pub duration: String,
    pub attribution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub license: VideoLicense,
}

/// Fields needed to create a video. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideo {
    pub url: String,
    pub title: String,
    pub creator: String,
    pub created_date: NaiveDateTime,
    pub duration: String,
    pub attribution: String,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub license: NewLicense,
}

/// Fields needed to create the license that accompanies a [`NewVideo`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewLicense {
    pub license_type: LicenseType,
    pub start_date: NaiveDateTime,
    pub expiration_date: Option<NaiveDateTime>,
    pub terms: Vec<String>,
    pub restrictions: Vec<String>,
    pub territory_restrictions: Vec<String>,
    pub renewal_terms: Option<String>,
}

/// Partial update of video fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoUpdate {
    pub url: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub created_date: Option<NaiveDateTime>,
    pub duration: Option<String>,
    pub attribution: Option<String>,
    /// `Some(None)` clears the thumbnail.
    pub thumbnail_url: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// Partial update of license fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LicenseUpdate {
    pub license_type: Option<LicenseType>,
    pub start_date: Option<NaiveDateTime>,
    /// `Some(None)` makes the license perpetual.
    pub expiration_date: Option<Option<NaiveDateTime>>,
    pub terms: Option<Vec<String>>,
    pub restrictions: Option<Vec<String>>,
    pub territory_restrictions: Option<Vec<String>>,
    pub renewal_terms: Option<Option<String>>,
}

/// Selection applied by the video query facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoFilter {
    All,
    Status(LicenseStatus),
    /// Videos that are NOT restricted in the given territory.
    TerritoryExclusion(String),
}

impl VideoFilter {
    /// Build a filter from the `status` / `territory` query pair.
    /// A status takes precedence over a territory.
    pub fn from_query(status: Option<LicenseStatus>, territory: Option<&str>) -> Self {
        match (status, territory) {
            (Some(status), _) => VideoFilter::Status(status),
            (None, Some(code)) if !code.trim().is_empty() => {
                VideoFilter::TerritoryExclusion(normalize_territory(code))
            }
            _ => VideoFilter::All,
        }
    }
}

impl VideoUpdate {
    pub fn is_empty(&self) -> bool {
        *self == VideoUpdate::default()
    }

    pub fn apply_to(self, video: &mut VideoContent) {
        if let Some(url) = self.url {
            video.url = url;
        }
        if let Some(title) = self.title {
            video.title = title;
        }
        if let Some(creator) = self.creator {
            video.creator = creator;
        }
        if let Some(created_date) = self.created_date {
            video.created_date = created_date;
        }
        if let Some(duration) = self.duration {
            video.duration = duration;
        }
        if let Some(attribution) = self.attribution {
            video.attribution = attribution;
        }
        if let Some(thumbnail_url) = self.thumbnail_url {
            video.thumbnail_url = thumbnail_url;
        }
        if let Some(tags) = self.tags {
            video.tags = tags;
        }
    }
}

impl LicenseUpdate {
    pub fn is_empty(&self) -> bool {
        *self == LicenseUpdate::default()
    }

    /// Merge the update into `license`. The merged dates are checked first and
    /// `license` is left untouched when they are inconsistent.
    pub fn apply_to(self, license: &mut VideoLicense) -> TouchlineResult<()> {
        let mut merged = license.clone();
        if let Some(license_type) = self.license_type {
            merged.license_type = license_type;
        }
        if let Some(start_date) = self.start_date {
            merged.start_date = start_date;
        }
        if let Some(expiration_date) = self.expiration_date {
            merged.expiration_date = expiration_date;
        }
        if let Some(terms) = self.terms {
            merged.terms = terms;
        }
        if let Some(restrictions) = self.restrictions {
            merged.restrictions = restrictions;
        }
        if let Some(territories) = self.territory_restrictions {
            merged.territory_restrictions = normalize_territories(territories);
        }
        if let Some(renewal_terms) = self.renewal_terms {
            merged.renewal_terms = renewal_terms;
        }

        merged.check_dates()?;
        *license = merged;
        Ok(())
    }
}

/// Upper-case and de-duplicate a territory list, keeping first-seen order.
pub fn normalize_territories(codes: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let code = normalize_territory(&code);
        if !code.is_empty() && !out.contains(&code) {
            out.push(code);
        }
    }
    out
}
