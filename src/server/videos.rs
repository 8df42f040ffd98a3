//! Video catalog endpoints.
//!
//! - `GET /api/videos?status=&territory=` - List videos (status wins over territory)
//! - `POST /api/videos` - Create a video and its license
//! - `GET /api/videos/alerts` - Videos whose license is expired or expiring soon
//! - `GET /api/videos/:id` - Get one video
//! - `PATCH /api/videos/:id` - Update video fields
//! - `DELETE /api/videos/:id` - Delete a video and its license
//! - `PATCH /api/videos/:id/license` - Update license fields
//! - `GET /api/videos/:id/player?territory=` - Player view for a viewer territory

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::license::{LicenseStatus, VideoLicense};
use crate::presentation::{license_alerts, player_view, LicenseAlert, PlayerView};
use crate::server::api_error::ApiError;
use crate::server::handlers::{json_body, AppState};
use crate::server::logging::{log_video_event, VideoEvent};
use crate::server::validation::{
    parse_datetime, parse_license_type, validate_length, validate_not_empty,
    validate_territory_codes, validate_url, ValidationError, ValidationResult, Validator,
};
use crate::store::list_videos;
use crate::video::{LicenseUpdate, NewLicense, NewVideo, VideoContent, VideoFilter, VideoUpdate};

const MAX_TITLE_LEN: usize = 200;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListVideosQuery {
    pub status: Option<String>,
    pub territory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayerQuery {
    pub territory: Option<String>,
}

/// Body of `POST /api/videos`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateVideoRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    /// ISO 8601 date or datetime
    pub created_date: Option<String>,
    pub duration: Option<String>,
    pub attribution: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub license: Option<CreateLicenseRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateLicenseRequest {
    #[serde(rename = "type")]
    pub license_type: Option<String>,
    pub start_date: Option<String>,
    pub expiration_date: Option<String>,
    pub terms: Vec<String>,
    pub restrictions: Vec<String>,
    pub territory_restrictions: Vec<String>,
    pub renewal_terms: Option<String>,
}

/// Body of `PATCH /api/videos/:id`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateVideoRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub created_date: Option<String>,
    pub duration: Option<String>,
    pub attribution: Option<String>,
    /// `null` clears the thumbnail
    #[serde(deserialize_with = "nullable")]
    pub thumbnail_url: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// Body of `PATCH /api/videos/:id/license`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateLicenseRequest {
    #[serde(rename = "type")]
    pub license_type: Option<String>,
    pub start_date: Option<String>,
    /// `null` makes the license perpetual
    #[serde(deserialize_with = "nullable")]
    pub expiration_date: Option<Option<String>>,
    pub terms: Option<Vec<String>>,
    pub restrictions: Option<Vec<String>>,
    pub territory_restrictions: Option<Vec<String>>,
    #[serde(deserialize_with = "nullable")]
    pub renewal_terms: Option<Option<String>>,
}

/// Distinguish an explicit `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn required<'a>(value: &'a Option<String>, field_name: &str) -> ValidationResult<&'a str> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::new(field_name, "is required")),
    }
}

fn required_text(v: &mut Validator, value: &Option<String>, field_name: &str) -> Option<String> {
    v.check(required(value, field_name)).map(|s| s.trim().to_string())
}

impl CreateVideoRequest {
    /// Validate every field and build the store input.
    pub fn into_new_video(self) -> Result<NewVideo, Vec<ValidationError>> {
        let mut v = Validator::new();

        let url = required_text(&mut v, &self.url, "url");
        if let Some(url) = &url {
            v.check(validate_url(url, "url"));
        }
        let title = required_text(&mut v, &self.title, "title");
        if let Some(title) = &title {
            v.check(validate_length(title, 1, MAX_TITLE_LEN, "title"));
        }
        let creator = required_text(&mut v, &self.creator, "creator");
        let created_date = v
            .check(required(&self.created_date, "createdDate"))
            .and_then(|s| v.check(parse_datetime(s, "createdDate")));
        let duration = required_text(&mut v, &self.duration, "duration");
        let attribution = required_text(&mut v, &self.attribution, "attribution");
        let thumbnail_url = self.thumbnail_url.filter(|t| !t.trim().is_empty());
        if let Some(thumb) = &thumbnail_url {
            v.check(validate_url(thumb, "thumbnailUrl"));
        }

        let license = match self.license {
            Some(license) => license.validate(&mut v),
            None => {
                v.check::<()>(Err(ValidationError::new("license", "is required")));
                None
            }
        };

        v.finish()?;

        match (url, title, creator, created_date, duration, attribution, license) {
            (
                Some(url),
                Some(title),
                Some(creator),
                Some(created_date),
                Some(duration),
                Some(attribution),
                Some(license),
            ) => Ok(NewVideo {
                url,
                title,
                creator,
                created_date,
                duration,
                attribution,
                thumbnail_url,
                tags: self.tags,
                license,
            }),
            _ => Err(vec![ValidationError::new("body", "incomplete payload")]),
        }
    }
}

impl CreateLicenseRequest {
    fn validate(self, v: &mut Validator) -> Option<NewLicense> {
        let license_type = v
            .check(required(&self.license_type, "license.type"))
            .and_then(|s| v.check(parse_license_type(s, "license.type")));
        let start_date = v
            .check(required(&self.start_date, "license.startDate"))
            .and_then(|s| v.check(parse_datetime(s, "license.startDate")));

        let mut expiration_ok = true;
        let expiration_date = match self.expiration_date.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => {
                let parsed = v.check(parse_datetime(s, "license.expirationDate"));
                expiration_ok = parsed.is_some();
                parsed
            }
            _ => None,
        };

        if let (Some(start), Some(end)) = (start_date, expiration_date) {
            if end < start {
                expiration_ok = false;
                v.check::<()>(Err(ValidationError::new(
                    "license.expirationDate",
                    "must not be before startDate",
                )));
            }
        }

        let territories_ok = v
            .check(validate_territory_codes(
                &self.territory_restrictions,
                "license.territoryRestrictions",
            ))
            .is_some();

        if !(expiration_ok && territories_ok) {
            return None;
        }

        Some(NewLicense {
            license_type: license_type?,
            start_date: start_date?,
            expiration_date,
            terms: self.terms,
            restrictions: self.restrictions,
            territory_restrictions: self.territory_restrictions,
            renewal_terms: self.renewal_terms,
        })
    }
}

impl UpdateVideoRequest {
    pub fn into_update(self) -> Result<VideoUpdate, Vec<ValidationError>> {
        let mut v = Validator::new();

        if let Some(url) = &self.url {
            v.check(validate_url(url, "url"));
        }
        if let Some(title) = &self.title {
            v.check(validate_length(title.trim(), 1, MAX_TITLE_LEN, "title"));
        }
        for (value, field) in [
            (&self.creator, "creator"),
            (&self.duration, "duration"),
            (&self.attribution, "attribution"),
        ] {
            if let Some(value) = value {
                v.check(validate_not_empty(value, field));
            }
        }
        let created_date = match &self.created_date {
            Some(s) => v.check(parse_datetime(s, "createdDate")),
            None => None,
        };
        if let Some(Some(thumb)) = &self.thumbnail_url {
            v.check(validate_url(thumb, "thumbnailUrl"));
        }

        v.finish()?;

        Ok(VideoUpdate {
            url: self.url.map(|s| s.trim().to_string()),
            title: self.title.map(|s| s.trim().to_string()),
            creator: self.creator.map(|s| s.trim().to_string()),
            created_date,
            duration: self.duration.map(|s| s.trim().to_string()),
            attribution: self.attribution.map(|s| s.trim().to_string()),
            thumbnail_url: self.thumbnail_url,
            tags: self.tags,
        })
    }
}

impl UpdateLicenseRequest {
    pub fn into_update(self) -> Result<LicenseUpdate, Vec<ValidationError>> {
        let mut v = Validator::new();

        let license_type = match &self.license_type {
            Some(s) => v.check(parse_license_type(s, "type")),
            None => None,
        };
        let start_date = match &self.start_date {
            Some(s) => v.check(parse_datetime(s, "startDate")),
            None => None,
        };
        let expiration_date = match &self.expiration_date {
            Some(Some(s)) => v.check(parse_datetime(s, "expirationDate")).map(Some),
            Some(None) => Some(None),
            None => None,
        };
        if let (Some(start), Some(Some(end))) = (start_date, expiration_date) {
            if end < start {
                v.check::<()>(Err(ValidationError::new(
                    "expirationDate",
                    "must not be before startDate",
                )));
            }
        }
        if let Some(codes) = &self.territory_restrictions {
            v.check(validate_territory_codes(codes, "territoryRestrictions"));
        }

        v.finish()?;

        Ok(LicenseUpdate {
            license_type,
            start_date,
            expiration_date,
            terms: self.terms,
            restrictions: self.restrictions,
            territory_restrictions: self.territory_restrictions,
            renewal_terms: self.renewal_terms,
        })
    }
}

/// Parse the `status` query value, treating an empty string as absent.
fn parse_status(raw: Option<&str>) -> Result<Option<LicenseStatus>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<LicenseStatus>().map(Some).map_err(|_| {
            ApiError::validation(vec![ValidationError::new(
                "status",
                format!("unknown status '{s}' (expected active, expired or expiring-soon)"),
            )])
        }),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/videos?status={status}&territory={code}`
pub async fn list_videos_handler(
    State(state): State<AppState>,
    Query(query): Query<ListVideosQuery>,
) -> Result<Json<Vec<VideoContent>>, ApiError> {
    let status = parse_status(query.status.as_deref())?;
    let filter = VideoFilter::from_query(status, query.territory.as_deref());
    info!("Listing videos filter={:?}", filter);

    let now = state.clock.now();
    let videos = list_videos(&*state.store, &filter, now, state.threshold_days()).await?;

    Ok(Json(videos))
}

/// `POST /api/videos`
pub async fn create_video_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateVideoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VideoContent>), ApiError> {
    let request = json_body(payload)?;
    let new_video = request.into_new_video().map_err(ApiError::validation)?;

    let video = state.store.create(new_video).await?;
    log_video_event(VideoEvent::Created, &video.id, Some(&video.title));

    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos/alerts`
pub async fn license_alerts_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<LicenseAlert>>, ApiError> {
    let now = state.clock.now();
    let videos = state.store.find_all().await?;
    Ok(Json(license_alerts(&videos, now, state.threshold_days())))
}

/// `GET /api/videos/:id`
pub async fn get_video_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VideoContent>, ApiError> {
    Ok(Json(state.store.find_by_id(&id).await?))
}

/// `PATCH /api/videos/:id`
pub async fn update_video_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateVideoRequest>, JsonRejection>,
) -> Result<Json<VideoContent>, ApiError> {
    let update = json_body(payload)?
        .into_update()
        .map_err(ApiError::validation)?;
    if update.is_empty() {
        return Err(ApiError::invalid_request("no fields to update"));
    }

    let video = state.store.update_video(&id, update).await?;
    log_video_event(VideoEvent::Updated, &id, None);

    Ok(Json(video))
}

/// `PATCH /api/videos/:id/license`
pub async fn update_license_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateLicenseRequest>, JsonRejection>,
) -> Result<Json<VideoLicense>, ApiError> {
    let update = json_body(payload)?
        .into_update()
        .map_err(ApiError::validation)?;
    if update.is_empty() {
        return Err(ApiError::invalid_request("no fields to update"));
    }

    let license = state.store.update_license(&id, update).await?;
    let details = license
        .expiration_date
        .map(|d| format!("expires {d}"))
        .unwrap_or_else(|| "perpetual".to_string());
    log_video_event(VideoEvent::LicenseUpdated, &id, Some(&details));

    Ok(Json(license))
}

/// `DELETE /api/videos/:id`
pub async fn delete_video_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&id).await?;
    log_video_event(VideoEvent::Deleted, &id, None);
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/videos/:id/player?territory={code}`
pub async fn player_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<PlayerView>, ApiError> {
    let territory = query
        .territory
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| state.licensing.default_territory.clone());

    let now = state.clock.now();
    let video = state.store.find_by_id(&id).await?;
    let view = player_view(&video, &territory, now, state.threshold_days());

    if !view.playable {
        log_video_event(
            VideoEvent::PlaybackBlocked,
            &id,
            Some(&format!("territory={} status={}", view.territory, view.status)),
        );
    }

    Ok(Json(view))
}
