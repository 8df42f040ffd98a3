use std::env;

use serial_test::serial;
use touchline::config::TouchlineConfig;

const VARS: &[&str] = &[
    "TOUCHLINE_SERVER_PORT",
    "TOUCHLINE_DATABASE_TYPE",
    "TOUCHLINE_DATABASE_URL",
    "TOUCHLINE_EXPIRING_THRESHOLD_DAYS",
    "TOUCHLINE_DEFAULT_TERRITORY",
    "TOUCHLINE_CRON_SECRET",
    "CRON_SECRET_KEY",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn env_overrides_defaults() {
    clear_env();
    env::set_var("TOUCHLINE_SERVER_PORT", "9191");
    env::set_var("TOUCHLINE_DATABASE_TYPE", "postgres");
    env::set_var("TOUCHLINE_DATABASE_URL", "postgres://db.internal/touchline");
    env::set_var("TOUCHLINE_EXPIRING_THRESHOLD_DAYS", "14");
    env::set_var("TOUCHLINE_DEFAULT_TERRITORY", "GB");

    let config = TouchlineConfig::load().unwrap();

    assert_eq!(config.server.port, 9191);
    assert_eq!(config.database.db_type, "postgres");
    assert_eq!(config.database.postgres_url, "postgres://db.internal/touchline");
    assert_eq!(config.licensing.expiring_threshold_days, 14);
    assert_eq!(config.licensing.default_territory, "GB");
    assert!(config.validate().is_ok());

    clear_env();
}

#[test]
#[serial]
fn cron_secret_falls_back_to_legacy_variable() {
    clear_env();
    env::set_var("CRON_SECRET_KEY", "legacy");
    assert_eq!(TouchlineConfig::load().unwrap().cron.secret, "legacy");

    env::set_var("TOUCHLINE_CRON_SECRET", "primary");
    assert_eq!(TouchlineConfig::load().unwrap().cron.secret, "primary");

    clear_env();
}

#[test]
#[serial]
fn sqlite_url_only_overrides_sqlite_setting() {
    clear_env();
    env::set_var("TOUCHLINE_DATABASE_URL", "sqlite::memory:");

    let config = TouchlineConfig::load().unwrap();
    assert_eq!(config.database.sqlite_url, "sqlite::memory:");
    assert_ne!(config.database.postgres_url, "sqlite::memory:");

    clear_env();
}

#[test]
#[serial]
fn unparseable_numbers_keep_defaults() {
    clear_env();
    env::set_var("TOUCHLINE_EXPIRING_THRESHOLD_DAYS", "soon");

    let config = TouchlineConfig::load().unwrap();
    assert_eq!(config.licensing.expiring_threshold_days, 30);

    clear_env();
}
