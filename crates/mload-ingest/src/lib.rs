//! mload Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Bulk-loads movie records from a JSON file into a MySQL table using a
//! fixed pool of concurrent insert workers.
//!
//! # Pipeline
//!
//! ```text
//! loader ──> distributor ──[job queue]──> worker 0..N ──> MovieStore
//!                 │                           │
//!                 └──── completion tracker ───┘──> outcome channel ──> LoadReport
//! ```
//!
//! - [`loader`]: reads and parses the input file
//! - [`queue`]: bounded (by default rendezvous) job queue
//! - [`tracker`]: counts records still in flight
//! - [`distributor`]: feeds the queue in input order and closes it
//! - [`worker`]: the fixed worker pool
//! - [`retry`]: insert-with-retry around a single record
//! - [`store`]: the destination abstraction and its MySQL implementation
//! - [`pipeline`]: wires everything together and produces a [`LoadReport`]
//!
//! # Example
//!
//! ```no_run
//! use mload_ingest::{config::LoaderConfig, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LoaderConfig::load()?;
//!     let report = pipeline::run(&config).await?;
//!     println!("{} of {} inserted", report.inserted, report.submitted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod distributor;
pub mod loader;
pub mod pipeline;
pub mod queue;
pub mod retry;
pub mod store;
pub mod tracker;
pub mod worker;

pub use pipeline::{LoadOptions, LoadReport, PipelineError};
pub use retry::RetryPolicy;
pub use store::{InsertFault, MovieStore, MySqlMovieStore};
