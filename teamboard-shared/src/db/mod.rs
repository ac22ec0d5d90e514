/// Persistence layer
///
/// # Modules
///
/// - `store`: persistence traits consumed by the core
/// - `memory`: in-process store for tests and local runs
/// - `postgres`: PostgreSQL store
/// - `pool`: connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use teamboard_shared::db::postgres::PgStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::from_url(std::env::var("DATABASE_URL")?)).await?;
///     let store = PgStore::new(pool);
///     Ok(())
/// }
/// ```

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;
pub mod store;

pub use memory::{MemoryStore, Outage};
pub use postgres::PgStore;
pub use store::{
    AccessLookup, CommentStore, IssueStore, NotificationStore, ProjectStore, Store, TeamStore,
    UserStore,
};
