//! MySQL connection pool setup

use crate::config::DatabaseConfig;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(#[source] sqlx::Error),

    #[error("Database is unreachable: {0}")]
    Unreachable(#[source] sqlx::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Build the shared pool without opening a connection yet.
///
/// sqlx offers no cap on idle connections; `min_connections` and
/// `idle_timeout` bound how many stay open while workers are idle.
pub fn create_pool(config: &DatabaseConfig) -> DbResult<MySqlPool> {
    let mut options = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

    if let Some(idle_timeout) = config.idle_timeout_secs {
        options = options.idle_timeout(Duration::from_secs(idle_timeout));
    }

    let pool = options.connect_lazy(&config.url).map_err(DbError::InvalidUrl)?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Single liveness probe
pub async fn health_check(pool: &MySqlPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::Unreachable)
}
