//! Video license model and status classification.
//!
//! A license is classified against an injected `now`:
//!
//! - no expiration date → `active`
//! - expiration before `now` → `expired`
//! - expiration before `now + threshold_days` → `expiring-soon`
//! - otherwise → `active`
//!
//! Availability for a viewer additionally requires that the viewer's
//! territory is not listed in the license's territory restrictions.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::{TouchlineError, TouchlineResult};

/// Lookahead window used when no threshold is configured.
pub const DEFAULT_EXPIRING_THRESHOLD_DAYS: u32 = 30;

/// Largest accepted lookahead window (ten years).
pub const MAX_EXPIRING_THRESHOLD_DAYS: u32 = 3650;

/// How the academy holds the rights to a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseType {
    Own,
    Licensed,
    CreativeCommons,
    Partnership,
}

impl LicenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseType::Own => "own",
            LicenseType::Licensed => "licensed",
            LicenseType::CreativeCommons => "creative-commons",
            LicenseType::Partnership => "partnership",
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "own" => Ok(LicenseType::Own),
            "licensed" => Ok(LicenseType::Licensed),
            "creative-commons" => Ok(LicenseType::CreativeCommons),
            "partnership" => Ok(LicenseType::Partnership),
            other => Err(format!(
                "unknown license type '{other}' (expected own, licensed, creative-commons or partnership)"
            )),
        }
    }
}

/// Derived validity of a license at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseStatus {
    Active,
    Expired,
    ExpiringSoon,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Active => "active",
            LicenseStatus::Expired => "expired",
            LicenseStatus::ExpiringSoon => "expiring-soon",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LicenseStatus::Active),
            "expired" => Ok(LicenseStatus::Expired),
            "expiring-soon" => Ok(LicenseStatus::ExpiringSoon),
            other => Err(format!(
                "unknown license status '{other}' (expected active, expired or expiring-soon)"
            )),
        }
    }
}

/// A license attached one-to-one to a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoLicense {
    pub id: String,
    pub video_id: String,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub start_date: NaiveDateTime,
    /// `None` means the license never expires.
    pub expiration_date: Option<NaiveDateTime>,
    pub terms: Vec<String>,
    pub restrictions: Vec<String>,
    /// Territory codes where the video must NOT be shown.
    pub territory_restrictions: Vec<String>,
    pub renewal_terms: Option<String>,
}

impl VideoLicense {
    /// Classify this license at `now`.
    pub fn status(&self, now: NaiveDateTime, threshold_days: u32) -> LicenseStatus {
        classify(self, now, threshold_days)
    }

    pub fn has_territory_restrictions(&self) -> bool {
        !self.territory_restrictions.is_empty()
    }

    /// Reject an expiration that falls before the start date.
    pub fn check_dates(&self) -> TouchlineResult<()> {
        match self.expiration_date {
            Some(expires) if expires < self.start_date => Err(TouchlineError::validation(
                "expirationDate",
                "must not be before startDate",
            )),
            _ => Ok(()),
        }
    }

    /// True when `territory` appears in the restriction list.
    pub fn is_restricted_in(&self, territory: &str) -> bool {
        let wanted = normalize_territory(territory);
        self.territory_restrictions
            .iter()
            .any(|code| normalize_territory(code) == wanted)
    }
}

/// End of the expiring-soon window that starts at `now`.
///
/// Saturates at the latest representable instant.
pub fn expiring_window_end(now: NaiveDateTime, threshold_days: u32) -> NaiveDateTime {
    now.checked_add_signed(Duration::days(i64::from(threshold_days)))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Classify an expiration date. Shared by [`classify`] and the in-memory store
/// so that both evaluate the same predicates.
pub fn classify_expiration(
    expiration_date: Option<NaiveDateTime>,
    now: NaiveDateTime,
    threshold_days: u32,
) -> LicenseStatus {
    match expiration_date {
        None => LicenseStatus::Active,
        Some(expires) if expires < now => LicenseStatus::Expired,
        Some(expires) if expires < expiring_window_end(now, threshold_days) => {
            LicenseStatus::ExpiringSoon
        }
        Some(_) => LicenseStatus::Active,
    }
}

/// Classify a license at `now` with the given lookahead.
pub fn classify(license: &VideoLicense, now: NaiveDateTime, threshold_days: u32) -> LicenseStatus {
    classify_expiration(license.expiration_date, now, threshold_days)
}

/// Whether a viewer in `viewer_territory` may play content under `license`.
///
/// Expiring-soon licenses are still playable.
pub fn is_available(license: &VideoLicense, viewer_territory: &str, now: NaiveDateTime) -> bool {
    if classify(license, now, DEFAULT_EXPIRING_THRESHOLD_DAYS) == LicenseStatus::Expired {
        return false;
    }
    !license.is_restricted_in(viewer_territory)
}

/// Canonical form of a territory code (trimmed, upper case).
pub fn normalize_territory(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn license(expiration_date: Option<NaiveDateTime>, territories: &[&str]) -> VideoLicense {
        VideoLicense {
            id: "lic-1".to_string(),
            video_id: "vid-1".to_string(),
            license_type: LicenseType::Licensed,
            start_date: at(2023, 1, 1),
            expiration_date,
            terms: vec!["Non-commercial use".to_string()],
            restrictions: vec![],
            territory_restrictions: territories.iter().map(|t| t.to_string()).collect(),
            renewal_terms: None,
        }
    }

    #[test]
    fn perpetual_license_is_always_active() {
        let lic = license(None, &[]);
        for now in [at(1990, 1, 1), at(2024, 1, 15), at(2099, 12, 31)] {
            assert_eq!(classify(&lic, now, 30), LicenseStatus::Active);
        }
    }

    #[test]
    fn license_expired_yesterday_is_expired() {
        let now = at(2024, 6, 1);
        let lic = license(Some(now - Duration::days(1)), &[]);
        assert_eq!(classify(&lic, now, 30), LicenseStatus::Expired);
    }

    #[test]
    fn expired_scenario() {
        let lic = license(Some(at(2024, 1, 1)), &[]);
        assert_eq!(classify(&lic, at(2024, 1, 15), 30), LicenseStatus::Expired);
    }

    #[test]
    fn expiring_soon_scenario() {
        let lic = license(Some(at(2024, 2, 10)), &[]);
        assert_eq!(
            classify(&lic, at(2024, 1, 15), 30),
            LicenseStatus::ExpiringSoon
        );
    }

    #[test]
    fn expiring_window_boundaries() {
        let now = at(2024, 1, 15);
        let inside = license(Some(now + Duration::days(29)), &[]);
        let edge = license(Some(now + Duration::days(30)), &[]);
        let beyond = license(Some(now + Duration::days(45)), &[]);

        assert_eq!(classify(&inside, now, 30), LicenseStatus::ExpiringSoon);
        assert_eq!(classify(&edge, now, 30), LicenseStatus::Active);
        assert_eq!(classify(&beyond, now, 30), LicenseStatus::Active);
    }

    #[test]
    fn threshold_is_configurable() {
        let now = at(2024, 1, 15);
        let lic = license(Some(now + Duration::days(10)), &[]);
        assert_eq!(classify(&lic, now, 7), LicenseStatus::Active);
        assert_eq!(classify(&lic, now, 14), LicenseStatus::ExpiringSoon);
    }

    #[test]
    fn window_end_saturates_instead_of_overflowing() {
        let now = at(2024, 1, 15);
        assert_eq!(expiring_window_end(now, 30), now + Duration::days(30));
        assert_eq!(expiring_window_end(NaiveDateTime::MAX, 1), NaiveDateTime::MAX);

        let far = license(Some(at(2099, 1, 1)), &[]);
        assert_eq!(
            classify(&far, NaiveDateTime::MAX - Duration::days(1), u32::MAX),
            LicenseStatus::Expired
        );
        assert_eq!(classify(&far, now, u32::MAX), LicenseStatus::ExpiringSoon);
    }

    #[test]
    fn expiration_before_start_fails_date_check() {
        assert!(license(None, &[]).check_dates().is_ok());
        assert!(license(Some(at(2023, 1, 1)), &[]).check_dates().is_ok());

        let err = license(Some(at(2022, 12, 31)), &[]).check_dates().unwrap_err();
        assert!(matches!(
            err,
            TouchlineError::Validation { field: "expirationDate", .. }
        ));
    }

    #[test]
    fn restricted_territory_is_unavailable_even_when_active() {
        let lic = license(None, &["US", "CA"]);
        let now = at(2024, 1, 15);
        assert!(!is_available(&lic, "US", now));
        assert!(!is_available(&lic, "ca", now));
        assert!(is_available(&lic, "GB", now));
    }

    #[test]
    fn expired_license_is_unavailable_everywhere() {
        let lic = license(Some(at(2024, 1, 1)), &[]);
        assert!(!is_available(&lic, "GB", at(2024, 1, 15)));
    }

    #[test]
    fn expiring_soon_license_is_still_available() {
        let lic = license(Some(at(2024, 2, 10)), &[]);
        assert!(is_available(&lic, "US", at(2024, 1, 15)));
    }

    #[test]
    fn status_and_type_round_trip_through_strings() {
        for status in [
            LicenseStatus::Active,
            LicenseStatus::Expired,
            LicenseStatus::ExpiringSoon,
        ] {
            assert_eq!(status.as_str().parse::<LicenseStatus>().unwrap(), status);
        }
        assert_eq!(
            "creative-commons".parse::<LicenseType>().unwrap(),
            LicenseType::CreativeCommons
        );
        assert!("borrowed".parse::<LicenseType>().is_err());
        assert!("soon".parse::<LicenseStatus>().is_err());
    }

    #[test]
    fn license_serializes_with_camel_case_and_type_key() {
        let lic = license(Some(at(2024, 2, 10)), &["US"]);
        let json = serde_json::to_value(&lic).unwrap();
        assert_eq!(json["type"], "licensed");
        assert_eq!(json["territoryRestrictions"][0], "US");
        assert!(json.get("expirationDate").is_some());
    }
}
