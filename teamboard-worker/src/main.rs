//! # Teamboard Worker
//!
//! Hosts the Teamboard core services: connects to PostgreSQL, applies
//! migrations, wires the AI provider and runs the notification loop until
//! Ctrl-C.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/teamboard cargo run -p teamboard-worker
//! ```

use anyhow::Context;
use std::sync::Arc;
use teamboard_shared::db::{self, PgStore};
use teamboard_shared::services::Services;
use teamboard_worker::config::{Config, LogFormat};
use teamboard_worker::host::ServiceHost;
use teamboard_worker::mailer::LogMailer;
use teamboard_worker::provider::HttpAiProvider;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(config.service.log_format);

    tracing::info!("Teamboard Worker v{} starting...", teamboard_shared::VERSION);

    let pool = db::pool::create_pool(db::pool::DatabaseConfig {
        max_connections: config.database.max_connections,
        ..db::pool::DatabaseConfig::from_url(config.database.url.clone())
    })
    .await
    .context("Failed to connect to database")?;

    db::migrations::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let provider = HttpAiProvider::new(&config.ai).context("Failed to build AI provider")?;
    if !provider.is_configured() {
        tracing::warn!("AI_API_KEY not set, AI assist requests will fail");
    }

    let (services, events) = Services::build(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(provider),
        Arc::new(LogMailer),
        config.assist_settings(),
    );

    let host = ServiceHost::new(services, events);
    let shutdown = host.shutdown_token();
    let handle = tokio::spawn(host.run());

    tracing::info!("Worker ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    shutdown.cancel();

    let stats = handle.await.context("Service host task panicked")??;
    pool.close().await;

    tracing::info!(dispatched = stats.dispatched, "Worker stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "teamboard_worker=debug,teamboard_shared=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}
