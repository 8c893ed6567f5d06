//! mload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the mload workspace.
//!
//! # Overview
//!
//! - **Types**: the [`Movie`](types::Movie) record moved through the loader
//! - **Error Handling**: [`MloadError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by [`LogConfig`](logging::LogConfig)
//!
//! # Example
//!
//! ```no_run
//! use mload_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! fn setup() -> mload_common::Result<()> {
//!     let config = LogConfig::default().with_level(LogLevel::Debug).merge_env()?;
//!     let _guard = init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{MloadError, Result};
pub use types::Movie;
