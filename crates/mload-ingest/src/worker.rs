//! Fixed-size pool of insert workers
//!
//! Each worker pulls movies from the shared job queue until it is closed and
//! drained. For every movie it runs [`insert_with_retry`], reports a
//! [`RecordOutcome`] on the outcome channel, and only then marks the record
//! done on the completion tracker, so every outcome is queued by the time
//! the tracker reaches zero.

use crate::queue::JobReceiver;
use crate::retry::{insert_with_retry, RetryPolicy};
use crate::store::{InsertFault, MovieStore};
use crate::tracker::CompletionTracker;
use mload_common::Movie;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default number of concurrent insert workers
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Final result for one movie
#[derive(Debug)]
pub struct RecordOutcome {
    pub worker: usize,
    pub movie: Movie,
    pub attempts: u32,
    pub result: Result<(), InsertFault>,
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker {worker} panicked: {message}")]
    Panicked { worker: usize, message: String },
}

/// Handles to the running workers
pub struct WorkerPool {
    handles: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    /// Launch `workers` tasks, numbered from 0, all sharing `store`.
    pub fn spawn<S>(
        workers: usize,
        jobs: JobReceiver<Movie>,
        store: Arc<S>,
        policy: RetryPolicy,
        tracker: CompletionTracker,
        outcomes: mpsc::UnboundedSender<RecordOutcome>,
    ) -> Self
    where
        S: MovieStore + ?Sized + 'static,
    {
        let handles = (0..workers)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    jobs.clone(),
                    Arc::clone(&store),
                    policy.clone(),
                    tracker.clone(),
                    outcomes.clone(),
                ))
            })
            .collect();

        info!(workers, "Worker pool started");
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit; returns how many movies they processed.
    pub async fn join(self) -> Result<usize, WorkerError> {
        let results = futures::future::join_all(self.handles).await;

        let mut processed = 0;
        for (worker, result) in results.into_iter().enumerate() {
            match result {
                Ok(count) => processed += count,
                // Worker handles are never aborted, so a join error is a panic.
                Err(e) => {
                    return Err(WorkerError::Panicked {
                        worker,
                        message: e.to_string(),
                    })
                },
            }
        }

        Ok(processed)
    }
}

async fn run_worker<S>(
    worker: usize,
    jobs: JobReceiver<Movie>,
    store: Arc<S>,
    policy: RetryPolicy,
    tracker: CompletionTracker,
    outcomes: mpsc::UnboundedSender<RecordOutcome>,
) -> usize
where
    S: MovieStore + ?Sized,
{
    let mut processed = 0;

    while let Some(movie) = jobs.recv().await {
        let _done = tracker.done_on_drop();
        let outcome = insert_with_retry(worker, &*store, &movie, &policy).await;

        // The orchestrator may have stopped listening; the insert still counts.
        let _ = outcomes.send(RecordOutcome {
            worker,
            movie,
            attempts: outcome.attempts,
            result: outcome.result,
        });
        processed += 1;
    }

    debug!(worker, processed, "Job queue drained, worker exiting");
    processed
}
