//! Configuration system for Touchline.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `TOUCHLINE_SERVER_HOST` - Server bind address
//! - `TOUCHLINE_SERVER_PORT` - Server port
//! - `TOUCHLINE_DATABASE_TYPE` - `sqlite`, `postgres` or `memory`
//! - `TOUCHLINE_DATABASE_URL` - Database connection URL
//! - `TOUCHLINE_LOGGING_ENABLED` - Enable the tracing subscriber
//! - `TOUCHLINE_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//! - `TOUCHLINE_EXPIRING_THRESHOLD_DAYS` - Lookahead for "expiring soon"
//! - `TOUCHLINE_DEFAULT_TERRITORY` - Viewer territory when none is given
//! - `TOUCHLINE_CRON_SECRET` (or `CRON_SECRET_KEY`) - Bearer secret for the cron endpoint
//! - `TOUCHLINE_CRON_SCHEDULE` - Cron expression for the in-process sweep
//! - `TOUCHLINE_CRON_ENABLED` - Run the in-process sweep (`background-jobs` feature)

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{TouchlineError, TouchlineResult};
use crate::license::{DEFAULT_EXPIRING_THRESHOLD_DAYS, MAX_EXPIRING_THRESHOLD_DAYS};

/// Global configuration singleton.
static CONFIG: OnceLock<TouchlineConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TouchlineConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// License classification settings
    pub licensing: LicensingConfig,
    /// Expiring-license sweep settings
    pub cron: CronConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite", "postgres" or "memory"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://touchline.db?mode=rwc".to_string(),
            postgres_url: "postgres://localhost/touchline".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

/// License classification settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LicensingConfig {
    /// Days ahead of expiration at which a license counts as expiring soon
    pub expiring_threshold_days: u32,
    /// Territory assumed for viewers that do not send one
    pub default_territory: String,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            expiring_threshold_days: DEFAULT_EXPIRING_THRESHOLD_DAYS,
            default_territory: "US".to_string(),
        }
    }
}

/// Expiring-license sweep settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CronConfig {
    /// Run the sweep in-process (requires the `background-jobs` feature)
    pub enabled: bool,
    /// Bearer secret expected on `GET /api/cron/check-licenses`.
    /// Empty means every request is rejected.
    pub secret: String,
    /// Six-field cron expression for the in-process sweep
    pub schedule: String,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret: String::new(),
            schedule: "0 0 6 * * *".to_string(),
        }
    }
}

fn config_err(e: config::ConfigError) -> TouchlineError {
    TouchlineError::ConfigError(e.to_string())
}

impl TouchlineConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> TouchlineResult<Self> {
        let defaults = TouchlineConfig::default();

        let builder = Config::builder()
            // Start with defaults
            .set_default("server.host", defaults.server.host)
            .map_err(config_err)?
            .set_default("server.port", i64::from(defaults.server.port))
            .map_err(config_err)?
            .set_default("database.db_type", defaults.database.db_type)
            .map_err(config_err)?
            .set_default("database.sqlite_url", defaults.database.sqlite_url)
            .map_err(config_err)?
            .set_default("database.postgres_url", defaults.database.postgres_url)
            .map_err(config_err)?
            .set_default("logging.enabled", defaults.logging.enabled)
            .map_err(config_err)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_err)?
            .set_default(
                "licensing.expiring_threshold_days",
                i64::from(defaults.licensing.expiring_threshold_days),
            )
            .map_err(config_err)?
            .set_default(
                "licensing.default_territory",
                defaults.licensing.default_territory,
            )
            .map_err(config_err)?
            .set_default("cron.enabled", defaults.cron.enabled)
            .map_err(config_err)?
            .set_default("cron.secret", defaults.cron.secret)
            .map_err(config_err)?
            .set_default("cron.schedule", defaults.cron.schedule)
            .map_err(config_err)?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("TOUCHLINE_SERVER_HOST").ok())
            .map_err(config_err)?
            .set_override_option(
                "server.port",
                env::var("TOUCHLINE_SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("database.db_type", env::var("TOUCHLINE_DATABASE_TYPE").ok())
            .map_err(config_err)?
            .set_override_option(
                "database.sqlite_url",
                env::var("TOUCHLINE_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.postgres_url",
                env::var("TOUCHLINE_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_err)?
            .set_override_option(
                "logging.enabled",
                env::var("TOUCHLINE_LOGGING_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("TOUCHLINE_LOG_LEVEL").ok())
            .map_err(config_err)?
            .set_override_option(
                "licensing.expiring_threshold_days",
                env::var("TOUCHLINE_EXPIRING_THRESHOLD_DAYS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option(
                "licensing.default_territory",
                env::var("TOUCHLINE_DEFAULT_TERRITORY").ok(),
            )
            .map_err(config_err)?
            .set_override_option(
                "cron.secret",
                env::var("TOUCHLINE_CRON_SECRET")
                    .or_else(|_| env::var("CRON_SECRET_KEY"))
                    .ok(),
            )
            .map_err(config_err)?
            .set_override_option("cron.schedule", env::var("TOUCHLINE_CRON_SCHEDULE").ok())
            .map_err(config_err)?
            .set_override_option(
                "cron.enabled",
                env::var("TOUCHLINE_CRON_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?;

        let settings = builder
            .build()
            .map_err(|e| TouchlineError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| TouchlineError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> TouchlineResult<()> {
        if self.server.port == 0 {
            return Err(TouchlineError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }

        match self.database.db_type.as_str() {
            "sqlite" | "postgres" | "memory" => {}
            other => {
                return Err(TouchlineError::ConfigError(format!(
                    "database.db_type must be 'sqlite', 'postgres' or 'memory', got '{other}'"
                )));
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(TouchlineError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        let threshold = self.licensing.expiring_threshold_days;
        if threshold == 0 || threshold > MAX_EXPIRING_THRESHOLD_DAYS {
            return Err(TouchlineError::ConfigError(format!(
                "licensing.expiring_threshold_days must be between 1 and {MAX_EXPIRING_THRESHOLD_DAYS}, got {threshold}"
            )));
        }

        if self.licensing.default_territory.trim().is_empty() {
            return Err(TouchlineError::ConfigError(
                "licensing.default_territory cannot be empty".to_string(),
            ));
        }

        if self.cron.enabled && self.cron.schedule.split_whitespace().count() != 6 {
            return Err(TouchlineError::ConfigError(format!(
                "cron.schedule must have six fields (sec min hour day month weekday), got '{}'",
                self.cron.schedule
            )));
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> TouchlineResult<&'static TouchlineConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = TouchlineConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is valid.
    Ok(CONFIG.get_or_init(|| config))
}

/// Initialize configuration explicitly.
///
/// Call this early in your application to catch configuration errors.
pub fn init_config() -> TouchlineResult<&'static TouchlineConfig> {
    get_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = TouchlineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.licensing.expiring_threshold_days, 30);
        assert_eq!(config.licensing.default_territory, "US");
        assert!(config.cron.secret.is_empty());
    }

    #[test]
    fn rejects_unknown_database_type() {
        let mut config = TouchlineConfig::default();
        config.database.db_type = "mysql".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_threshold() {
        let mut config = TouchlineConfig::default();
        config.licensing.expiring_threshold_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_huge_threshold() {
        let mut config = TouchlineConfig::default();
        config.licensing.expiring_threshold_days = 200_000_000;
        assert!(config.validate().is_err());

        config.licensing.expiring_threshold_days = MAX_EXPIRING_THRESHOLD_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_five_field_cron_when_enabled() {
        let mut config = TouchlineConfig::default();
        config.cron.enabled = true;
        config.cron.schedule = "0 6 * * *".to_string();
        assert!(config.validate().is_err());

        config.cron.enabled = false;
        assert!(config.validate().is_ok());
    }
}
