/// PostgreSQL connection pool for the Teamboard store
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/teamboard")).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection pool settings. Timeouts are in seconds.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// Idle connections kept warm
    pub min_connections: u32,

    /// How long an acquire may wait before failing
    pub acquire_timeout_seconds: u64,

    /// Idle connections are closed after this long (None = never)
    pub idle_timeout_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 10,
            idle_timeout_seconds: Some(600),
        }
    }
}

impl DatabaseConfig {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Creates the pool and verifies connectivity
///
/// Acquisition is bounded by `acquire_timeout_seconds`, so no store call can wait
/// on the pool indefinitely.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the database does not answer the
/// health check.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database connection pool"
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

    if let Some(idle) = config.idle_timeout_seconds {
        options = options.idle_timeout(Duration::from_secs(idle));
    }

    let pool = options.connect(&config.url).await?;
    health_check(&pool).await?;

    info!("Database connection pool ready");
    Ok(pool)
}

/// Runs `SELECT 1` against the pool
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    let (value,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if value == 1 {
        debug!("Database health check passed");
        Ok(())
    } else {
        warn!(value, "Database health check returned unexpected value");
        Err(sqlx::Error::Protocol(
            "Health check returned unexpected value".into(),
        ))
    }
}
