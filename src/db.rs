//! PostgreSQL pool and migrations.
//!
//! One pool is created at startup and shared with every handler through
//! [`crate::state::AppState`]. Generation flows only hold a connection for
//! the duration of a single-row read or write (never across provider polls),
//! so a small pool covers the whole workload, character packs included.

use sqlx::{Pool, Postgres};
use std::time::Duration;

/// Shared handle to the PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// Open the connection pool.
///
/// Connections are established lazily; a database that is down at boot
/// surfaces on the first query, and `/health` reports it.
///
/// # Errors
///
/// Returns an error if the connection string cannot be parsed or the initial
/// connection attempt fails outright.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        // Queries between provider polls are short; waiting longer than this
        // for a connection means something is genuinely wrong.
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Apply pending migrations from `migrations/`.
///
/// The files are embedded at compile time and tracked in the
/// `_sqlx_migrations` table, so reruns are no-ops. Migration failures abort
/// startup rather than letting the server run against a half-migrated
/// schema.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
