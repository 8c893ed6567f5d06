//! Configuration management
//!
//! Values come from the environment (a `.env` file is honoured), falling
//! back to the constants below. Command-line flags may override them
//! afterwards; call [`LoaderConfig::validate`] once everything is applied.

use crate::loader::DEFAULT_INPUT_PATH;
use crate::queue::MAX_QUEUE_CAPACITY;
use crate::retry::{RetryPolicy, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF};
use crate::worker::DEFAULT_WORKER_COUNT;
use mload_common::{MloadError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Default destination for local development.
pub const DEFAULT_DATABASE_URL: &str = "mysql://root@127.0.0.1:3306/go_rest_api";

/// Pool ceiling, matching the worker count so each worker can hold a connection.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 0;

pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Zero means a rendezvous queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 0;

/// Everything a load run needs
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub database: DatabaseConfig,
    pub input_path: PathBuf,
    pub workers: usize,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: Some(DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            workers: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Parse `key` if set; an unparsable value is an error rather than ignored.
fn env_var<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MloadError::config(format!("{} has an invalid value: '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

impl LoaderConfig {
    /// Load configuration from environment and defaults, then validate it.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read the environment without validating
    pub fn from_env() -> Result<Self> {
        let defaults = DatabaseConfig::default();

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").unwrap_or(defaults.url),
            max_connections: env_var("DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            min_connections: env_var("DATABASE_MIN_CONNECTIONS")?
                .unwrap_or(defaults.min_connections),
            connect_timeout_secs: env_var("DATABASE_CONNECT_TIMEOUT")?
                .unwrap_or(defaults.connect_timeout_secs),
            idle_timeout_secs: env_var("DATABASE_IDLE_TIMEOUT")?.or(defaults.idle_timeout_secs),
        };

        let retry = if env_var("MLOAD_RETRY_FOREVER")?.unwrap_or(false) {
            RetryPolicy::Unbounded
        } else {
            RetryPolicy::Bounded {
                max_attempts: env_var("MLOAD_MAX_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS),
                initial_backoff: env_var("MLOAD_INITIAL_BACKOFF_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_INITIAL_BACKOFF),
                max_backoff: env_var("MLOAD_MAX_BACKOFF_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_MAX_BACKOFF),
            }
        };

        Ok(Self {
            database,
            input_path: std::env::var("MLOAD_INPUT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_INPUT_PATH)),
            workers: env_var("MLOAD_WORKERS")?.unwrap_or(DEFAULT_WORKER_COUNT),
            queue_capacity: env_var("MLOAD_QUEUE_CAPACITY")?.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            retry,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(MloadError::config("Database URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(MloadError::config("Database max_connections must be greater than 0"));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(MloadError::config(format!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        if self.workers == 0 {
            return Err(MloadError::config("Worker count must be greater than 0"));
        }

        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(MloadError::config(format!(
                "Queue capacity ({}) cannot exceed {}",
                self.queue_capacity, MAX_QUEUE_CAPACITY
            )));
        }

        if let RetryPolicy::Bounded {
            max_attempts,
            initial_backoff,
            max_backoff,
        } = &self.retry
        {
            if *max_attempts == 0 {
                return Err(MloadError::config("Retry max_attempts must be greater than 0"));
            }
            if initial_backoff > max_backoff {
                return Err(MloadError::config(format!(
                    "Initial backoff ({:?}) cannot exceed max backoff ({:?})",
                    initial_backoff, max_backoff
                )));
            }
        }

        if self.workers > self.database.max_connections as usize {
            tracing::warn!(
                workers = self.workers,
                max_connections = self.database.max_connections,
                "More workers than pooled connections; extra workers will wait on the pool"
            );
        }

        Ok(())
    }
}
