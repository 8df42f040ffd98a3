//! `GET /api/cron/check-licenses`
//!
//! Entry point for an external scheduler. The caller must send
//! `Authorization: Bearer <cron.secret>`; when no secret is configured every
//! request is rejected.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use crate::errors::TouchlineError;
use crate::jobs::run_expiring_license_sweep;
use crate::server::api_error::ApiError;
use crate::server::handlers::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckLicensesResponse {
    pub success: bool,
    pub notifications_created: u32,
    pub message: String,
}

/// Whether `headers` carry `Bearer <expected>`.
///
/// Both sides are hashed before comparison so the check does not depend on
/// where the first differing byte is.
pub fn bearer_matches(headers: &HeaderMap, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    let Some(presented) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return false;
    };

    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}

pub async fn check_licenses_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CheckLicensesResponse>, ApiError> {
    if !bearer_matches(&headers, &state.cron_secret) {
        warn!("Rejected cron request with missing or invalid secret");
        return Err(TouchlineError::Unauthorized.into());
    }

    let now = state.clock.now();
    let created = run_expiring_license_sweep(&*state.store, now, state.threshold_days())
        .await
        .map_err(|e| {
            error!("Expiring-license check failed: {}", e);
            ApiError::internal_error()
        })?;

    info!("Cron license check created {} notifications", created);

    Ok(Json(CheckLicensesResponse {
        success: true,
        notifications_created: created,
        message: format!("Created {created} notifications for expiring licenses"),
    }))
}
