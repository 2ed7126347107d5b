//! Database connection pool management.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Create a PostgreSQL connection pool.
///
/// The pool is bounded by `database_max_connections`; requests that cannot
/// get a connection within `database_acquire_timeout` fail with a
/// retryable error instead of queueing indefinitely.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = pool_options(config)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Create a pool that connects on first use.
///
/// Lets the router be assembled (and exercised) before the database is reachable.
pub fn create_lazy_pool(config: &Config) -> Result<PgPool> {
    pool_options(config)
        .connect_lazy(&config.database_url)
        .context("invalid DATABASE_URL")
}

fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.database_acquire_timeout)
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
