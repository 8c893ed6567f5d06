//! Insert-with-retry around a single record
//!
//! Two policies are available. [`RetryPolicy::Bounded`] (the default) retries
//! only faults that [`InsertFault::is_retryable`] accepts, with exponential
//! backoff and an attempt cap, and hands anything else back to the caller.
//! [`RetryPolicy::Unbounded`] retries every fault immediately until the
//! insert succeeds; a permanently failing record then occupies its worker
//! forever.

use crate::store::{InsertFault, MovieStore};
use mload_common::Movie;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry transient faults up to `max_attempts` total attempts
    Bounded {
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
    },
    /// Retry every fault, forever, without delay
    Unbounded,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Bounded {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Bounded policy with `max_attempts`; an unbounded policy becomes the
    /// default bounded one.
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        match self {
            Self::Bounded {
                initial_backoff,
                max_backoff,
                ..
            } => Self::Bounded {
                max_attempts,
                initial_backoff,
                max_backoff,
            },
            Self::Unbounded => Self::Bounded {
                max_attempts,
                initial_backoff: DEFAULT_INITIAL_BACKOFF,
                max_backoff: DEFAULT_MAX_BACKOFF,
            },
        }
    }

    /// Delay before the next attempt after `attempt` (1-based) failed with
    /// `fault`, or `None` to give up.
    pub fn next_backoff(&self, attempt: u32, fault: &InsertFault) -> Option<Duration> {
        match self {
            Self::Unbounded => Some(Duration::ZERO),
            Self::Bounded {
                max_attempts,
                initial_backoff,
                max_backoff,
            } => {
                if attempt >= *max_attempts || !fault.is_retryable() {
                    return None;
                }
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                Some(initial_backoff.saturating_mul(factor).min(*max_backoff))
            },
        }
    }
}

/// How a record's insert ended
#[derive(Debug)]
pub struct InsertOutcome {
    pub attempts: u32,
    pub result: Result<(), InsertFault>,
}

impl InsertOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Insert `movie`, retrying according to `policy`.
///
/// Only returns once the insert succeeded or the policy gave up.
pub async fn insert_with_retry<S>(
    worker: usize,
    store: &S,
    movie: &Movie,
    policy: &RetryPolicy,
) -> InsertOutcome
where
    S: MovieStore + ?Sized,
{
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);

        let fault = match store.insert(movie).await {
            Ok(()) => {
                info!("worker {} success insert movie with id: {}", worker, movie.id);
                return InsertOutcome {
                    attempts: attempt,
                    result: Ok(()),
                };
            },
            Err(fault) => fault,
        };

        let Some(backoff) = policy.next_backoff(attempt, &fault) else {
            error!(
                worker,
                id = %movie.id,
                attempts = attempt,
                fault = fault.kind(),
                error = %fault,
                "Giving up on movie"
            );
            return InsertOutcome {
                attempts: attempt,
                result: Err(fault),
            };
        };

        warn!(
            worker,
            id = %movie.id,
            attempt,
            fault = fault.kind(),
            error = %fault,
            backoff_ms = backoff.as_millis() as u64,
            "Insert failed, retrying"
        );

        if backoff.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(backoff).await;
        }
    }
}
