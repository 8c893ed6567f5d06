//! Load orchestration
//!
//! [`run`] is the whole program: connect, probe, read the input, fan the
//! movies out to the worker pool and report. [`run_load`] is the part after
//! setup and works against any [`MovieStore`].

use crate::config::LoaderConfig;
use crate::db::{self, DbError};
use crate::distributor::distribute;
use crate::loader::{load_movies, LoaderError};
use crate::queue::job_queue;
use crate::retry::RetryPolicy;
use crate::store::{InsertFault, MovieStore, MySqlMovieStore};
use crate::tracker::CompletionTracker;
use crate::worker::{WorkerError, WorkerPool, DEFAULT_WORKER_COUNT};
use mload_common::{MloadError, Movie};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Setup and execution failures. Per-movie insert failures are not errors;
/// they are listed in [`LoadReport::failed`].
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] MloadError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Knobs for a single load
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub workers: usize,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            queue_capacity: 0,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&LoaderConfig> for LoadOptions {
    fn from(config: &LoaderConfig) -> Self {
        Self {
            workers: config.workers,
            queue_capacity: config.queue_capacity,
            retry: config.retry.clone(),
        }
    }
}

/// A movie the retry policy gave up on
#[derive(Debug)]
pub struct FailedRecord {
    pub movie: Movie,
    pub worker: usize,
    pub attempts: u32,
    pub fault: InsertFault,
}

/// Summary of a finished load
#[derive(Debug)]
pub struct LoadReport {
    pub submitted: usize,
    pub inserted: usize,
    pub failed: Vec<FailedRecord>,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.inserted == self.submitted
    }

    /// Elapsed wall-clock time rounded up to whole seconds
    pub fn elapsed_secs_ceil(&self) -> u64 {
        let secs = self.elapsed.as_secs();
        if self.elapsed.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Insert `movies` through `store` with a fresh worker pool.
///
/// Returns once every submitted movie was inserted or given up on.
pub async fn run_load<S>(
    movies: Vec<Movie>,
    store: Arc<S>,
    options: &LoadOptions,
) -> Result<LoadReport, WorkerError>
where
    S: MovieStore + ?Sized + 'static,
{
    let start = Instant::now();
    let tracker = CompletionTracker::new();
    let (jobs_tx, jobs_rx) = job_queue(options.queue_capacity);
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

    let pool = WorkerPool::spawn(
        options.workers,
        jobs_rx,
        store,
        options.retry.clone(),
        tracker.clone(),
        outcome_tx,
    );

    let submitted = distribute(movies, jobs_tx, &tracker).await;
    tracker.wait().await;
    pool.join().await?;

    let mut inserted = 0;
    let mut failed = Vec::new();
    while let Some(outcome) = outcome_rx.recv().await {
        match outcome.result {
            Ok(()) => inserted += 1,
            Err(fault) => failed.push(FailedRecord {
                movie: outcome.movie,
                worker: outcome.worker,
                attempts: outcome.attempts,
                fault,
            }),
        }
    }

    Ok(LoadReport {
        submitted,
        inserted,
        failed,
        elapsed: start.elapsed(),
    })
}

/// Run a complete load against MySQL as described by `config`.
///
/// Setup problems (invalid config, unreachable database, unreadable or
/// malformed input) fail fast before any insert is attempted.
pub async fn run(config: &LoaderConfig) -> Result<LoadReport, PipelineError> {
    let start = Instant::now();
    config.validate()?;

    let pool = db::create_pool(&config.database)?;
    db::health_check(&pool).await?;
    info!("Database connected");

    let movies = load_movies(&config.input_path).await?;
    let store = Arc::new(MySqlMovieStore::new(pool.clone()));

    let mut report = run_load(movies, store, &LoadOptions::from(config)).await?;
    pool.close().await;
    report.elapsed = start.elapsed();

    if !report.failed.is_empty() {
        warn!(
            failed = report.failed.len(),
            inserted = report.inserted,
            submitted = report.submitted,
            "Some movies were not inserted"
        );
    }
    info!(elapsed_ms = report.elapsed.as_millis() as u64, "Load finished");

    Ok(report)
}
