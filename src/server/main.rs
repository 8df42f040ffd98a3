use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};

use touchline::config::{init_config, TouchlineConfig};
use touchline::server::{build_router, AppState, Database};
use touchline::store::{MemoryStore, Store};

#[cfg(feature = "background-jobs")]
use touchline::{
    clock::SystemClock,
    jobs::{JobConfig, JobScheduler},
};

fn init_tracing(config: &TouchlineConfig) {
    if !config.logging.enabled {
        return;
    }

    let level = config
        .logging
        .level
        .parse::<Level>()
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .init();
}

async fn open_store(config: &TouchlineConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    if config.database.db_type == "memory" {
        warn!("Using in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db = Database::new(&config.database).await?;
    db.migrate().await?;
    let store: Arc<dyn Store> = db;
    Ok(store)
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received Ctrl+C, shutting down");
    token.cancel();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = init_config()?;
    init_tracing(config);

    let store = open_store(config).await?;
    info!("Store ready ({})", store.backend_name());

    let shutdown = CancellationToken::new();

    #[cfg(feature = "background-jobs")]
    let mut scheduler = if config.cron.enabled {
        let scheduler = JobScheduler::new(
            Arc::clone(&store),
            Arc::new(SystemClock),
            JobConfig::from_settings(&config.cron, config.licensing.expiring_threshold_days),
        )
        .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        None
    };

    #[cfg(not(feature = "background-jobs"))]
    if config.cron.enabled {
        warn!("cron.enabled is set but the 'background-jobs' feature is not compiled in");
    }

    let app = build_router(AppState::from_config(store, config));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Touchline listening on http://{}", addr);

    tokio::spawn(shutdown_signal(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    #[cfg(feature = "background-jobs")]
    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }

    info!("Server stopped");
    Ok(())
}
