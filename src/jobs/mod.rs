//! Background jobs for Touchline.
//!
//! The expiring-license sweep lives here. It can be triggered three ways:
//! - `GET /api/cron/check-licenses` from an external scheduler
//! - the in-process [`JobScheduler`] (requires the `background-jobs` feature)
//! - directly via [`run_expiring_license_sweep`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use touchline::jobs::{JobScheduler, JobConfig};
//!
//! let scheduler = JobScheduler::new(store, clock, JobConfig::default()).await?;
//! scheduler.start().await?;
//! ```

mod license_sweep;

pub use license_sweep::run_expiring_license_sweep;

#[cfg(feature = "background-jobs")]
pub use scheduler::JobScheduler;

use crate::config::CronConfig;
use crate::license::DEFAULT_EXPIRING_THRESHOLD_DAYS;

/// Configuration for background jobs.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Cron expression for the sweep (default: daily at 06:00 UTC)
    pub license_sweep_cron: String,
    /// Lookahead window in days (default: 30)
    pub expiring_threshold_days: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            license_sweep_cron: "0 0 6 * * *".to_string(),
            expiring_threshold_days: DEFAULT_EXPIRING_THRESHOLD_DAYS,
        }
    }
}

impl JobConfig {
    pub fn from_settings(cron: &CronConfig, expiring_threshold_days: u32) -> Self {
        Self {
            license_sweep_cron: cron.schedule.clone(),
            expiring_threshold_days,
        }
    }
}

/// Errors that can occur in background jobs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Scheduler error: {0}")]
    SchedulerError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<crate::errors::TouchlineError> for JobError {
    fn from(err: crate::errors::TouchlineError) -> Self {
        JobError::DatabaseError(err.to_string())
    }
}

#[cfg(feature = "background-jobs")]
mod scheduler {
    use std::sync::Arc;

    use tokio_cron_scheduler::{Job, JobScheduler as TokioJobScheduler};
    use tracing::{error, info};

    use super::{run_expiring_license_sweep, JobConfig, JobError};
    use crate::clock::Clock;
    use crate::store::Store;

    /// Cron-driven runner for the expiring-license sweep.
    pub struct JobScheduler {
        scheduler: TokioJobScheduler,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        config: JobConfig,
    }

    impl JobScheduler {
        pub async fn new(
            store: Arc<dyn Store>,
            clock: Arc<dyn Clock>,
            config: JobConfig,
        ) -> Result<Self, JobError> {
            let scheduler = TokioJobScheduler::new()
                .await
                .map_err(|e| JobError::SchedulerError(e.to_string()))?;

            Ok(Self {
                scheduler,
                store,
                clock,
                config,
            })
        }

        /// Register the sweep job and start ticking.
        pub async fn start(&self) -> Result<(), JobError> {
            info!("Starting Touchline job scheduler");

            self.add_license_sweep_job().await?;

            self.scheduler
                .start()
                .await
                .map_err(|e| JobError::SchedulerError(e.to_string()))?;

            info!("Touchline job scheduler started successfully");

            Ok(())
        }

        pub async fn shutdown(&mut self) -> Result<(), JobError> {
            info!("Shutting down Touchline job scheduler");
            self.scheduler
                .shutdown()
                .await
                .map_err(|e| JobError::SchedulerError(e.to_string()))?;
            Ok(())
        }

        async fn add_license_sweep_job(&self) -> Result<(), JobError> {
            let store = Arc::clone(&self.store);
            let clock = Arc::clone(&self.clock);
            let threshold_days = self.config.expiring_threshold_days;

            let job = Job::new_async(self.config.license_sweep_cron.as_str(), move |_uuid, _l| {
                let store = Arc::clone(&store);
                let clock = Arc::clone(&clock);
                Box::pin(async move {
                    let now = clock.now();
                    info!("Running expiring-license sweep at {}", now);

                    match run_expiring_license_sweep(&*store, now, threshold_days).await {
                        Ok(count) => {
                            if count > 0 {
                                info!("License sweep: {} notifications created", count);
                            }
                        }
                        Err(e) => {
                            error!("License sweep failed: {}", e);
                        }
                    }
                })
            })
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;

            self.scheduler
                .add(job)
                .await
                .map_err(|e| JobError::SchedulerError(e.to_string()))?;

            info!(
                "Added expiring-license sweep job (schedule: {}, threshold: {} days)",
                self.config.license_sweep_cron, threshold_days
            );

            Ok(())
        }

        /// Run the sweep immediately (manual trigger).
        pub async fn run_license_sweep_now(&self) -> Result<u32, JobError> {
            run_expiring_license_sweep(
                &*self.store,
                self.clock.now(),
                self.config.expiring_threshold_days,
            )
            .await
        }
    }
}
