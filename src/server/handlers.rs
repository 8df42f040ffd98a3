use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::config::{LicensingConfig, TouchlineConfig};
use crate::server::api_error::ApiError;
use crate::server::logging::HealthResponse;
use crate::store::Store;

/// Shared application state for handlers.
///
/// Handlers read the clock once per request and pass that instant to both
/// the store and the classifier.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub licensing: LicensingConfig,
    /// Bearer secret for the cron endpoint. Empty rejects every caller.
    pub cron_secret: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        licensing: LicensingConfig,
        cron_secret: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            licensing,
            cron_secret: cron_secret.into(),
        }
    }

    /// State wired to the system clock and the loaded configuration.
    pub fn from_config(store: Arc<dyn Store>, config: &TouchlineConfig) -> Self {
        Self::new(
            store,
            Arc::new(SystemClock),
            config.licensing.clone(),
            config.cron.secret.clone(),
        )
    }

    pub fn threshold_days(&self) -> u32 {
        self.licensing.expiring_threshold_days
    }
}

/// Unwrap a JSON body, turning malformed input into a 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            Err(ApiError::invalid_request(rejection.body_text()))
        }
    }
}

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.store.ping().await;
    Json(HealthResponse::healthy(connected, state.store.backend_name()))
}
