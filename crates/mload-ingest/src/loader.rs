//! Input file loading
//!
//! The input is a single JSON array of `{"id", "title", "rank"}` objects.
//! It is read and parsed in one go before any record is handed to a worker.

use mload_common::Movie;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Default input location, relative to the working directory
pub const DEFAULT_INPUT_PATH: &str = "data/movies-100.json";

#[derive(Error, Debug)]
pub enum LoaderError {
    /// The file is missing or unreadable
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not a JSON array of movie objects
    #[error("Invalid movie data in {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read `path` and return its records in file order.
pub async fn load_movies(path: impl AsRef<Path>) -> Result<Vec<Movie>, LoaderError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Reading movie data");

    let raw = tokio::fs::read(path).await.map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let movies = parse_movies(&raw).map_err(|source| LoaderError::Format {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), count = movies.len(), "Loaded movie data");
    Ok(movies)
}

/// Parse an in-memory JSON document into records.
pub fn parse_movies(raw: &[u8]) -> Result<Vec<Movie>, serde_json::Error> {
    serde_json::from_slice(raw)
}
