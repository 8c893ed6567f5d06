//! Shared helpers for mload-ingest integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use mload_common::Movie;
use mload_ingest::InsertFault;
use mload_ingest::MovieStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// In-memory `movie` table with a primary key on `id`.
///
/// Inserts go through a semaphore standing in for a connection pool, and the
/// store records how many inserts held a "connection" at the same time.
pub struct MemoryStore {
    rows: Mutex<HashMap<String, Movie>>,
    order: Mutex<Vec<String>>,
    connections: Semaphore,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    /// id -> remaining transient failures before the insert succeeds
    flaky: Mutex<HashMap<String, usize>>,
    latency: Duration,
}

impl MemoryStore {
    pub fn new(max_connections: usize) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            connections: Semaphore::new(max_connections),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            flaky: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Pre-populate a row, as if left by an earlier run
    pub fn seed(self, movie: Movie) -> Self {
        self.rows.lock().unwrap().insert(movie.id.clone(), movie);
        self
    }

    /// Fail the first `times` inserts of `id` with a pool timeout
    pub fn flaky(self, id: &str, times: usize) -> Self {
        self.flaky.lock().unwrap().insert(id.to_string(), times);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn row(&self, id: &str) -> Option<Movie> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Ids in the order their inserts succeeded
    pub fn insert_order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_connections(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn insert(&self, movie: &Movie) -> Result<(), InsertFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let _permit = self
            .connections
            .acquire()
            .await
            .map_err(|_| InsertFault::ConnectionAcquisition(sqlx::Error::PoolClosed))?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = self.write_row(movie);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl MemoryStore {
    fn write_row(&self, movie: &Movie) -> Result<(), InsertFault> {
        if let Some(remaining) = self.flaky.lock().unwrap().get_mut(&movie.id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(InsertFault::StatementExecution(sqlx::Error::PoolTimedOut));
            }
        }

        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&movie.id) {
            return Err(InsertFault::DuplicateKey {
                id: movie.id.clone(),
            });
        }
        rows.insert(movie.id.clone(), movie.clone());
        self.order.lock().unwrap().push(movie.id.clone());
        Ok(())
    }
}

/// `n` distinct movies with ids "1".."n"
pub fn movies(n: usize) -> Vec<Movie> {
    (1..=n)
        .map(|i| Movie::new(i.to_string(), format!("Movie {}", i), i.to_string()))
        .collect()
}
