//! mload - bulk-load movie records into MySQL

use anyhow::Result;
use clap::Parser;
use mload_common::logging::{init_logging, LogConfig, LogLevel};
use mload_ingest::config::LoaderConfig;
use mload_ingest::{pipeline, RetryPolicy};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "mload")]
#[command(author, version, about = "Bulk-load movie records into MySQL")]
struct Cli {
    /// JSON file holding an array of {id, title, rank} objects
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// MySQL connection URL
    #[arg(long)]
    database_url: Option<String>,

    /// Number of concurrent insert workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Job queue capacity (0 hands each movie directly to a waiting worker)
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Attempts per movie before giving up on transient faults
    #[arg(long, conflicts_with = "retry_forever")]
    max_attempts: Option<u32>,

    /// Retry every failed insert immediately until it succeeds
    #[arg(long)]
    retry_forever: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, config: &mut LoaderConfig) {
        if let Some(input) = self.input {
            config.input_path = input;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if self.retry_forever {
            config.retry = RetryPolicy::Unbounded;
        } else if let Some(attempts) = self.max_attempts {
            config.retry = config.retry.clone().with_max_attempts(attempts);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::default()
        .with_level(log_level)
        .with_file_prefix("mload")
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    let mut config = LoaderConfig::from_env()?;
    cli.apply(&mut config);

    let report = match pipeline::run(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Load aborted");
            return Err(e.into());
        },
    };

    // Printed regardless of the log level or log output.
    println!("done in {} seconds", report.elapsed_secs_ceil());

    if !report.is_success() {
        for failed in &report.failed {
            error!(
                id = %failed.movie.id,
                worker = failed.worker,
                attempts = failed.attempts,
                error = %failed.fault,
                "Movie not inserted"
            );
        }
        anyhow::bail!(
            "{} of {} movies could not be inserted",
            report.submitted - report.inserted,
            report.submitted
        );
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "mload",
            "--input",
            "movies.json",
            "--workers",
            "3",
            "--queue-capacity",
            "5",
            "--max-attempts",
            "2",
        ])
        .unwrap();

        let mut config = LoaderConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.input_path, PathBuf::from("movies.json"));
        assert_eq!(config.workers, 3);
        assert_eq!(config.queue_capacity, 5);
        assert!(matches!(config.retry, RetryPolicy::Bounded { max_attempts: 2, .. }));
    }

    #[test]
    fn test_retry_forever_flag() {
        let cli = Cli::try_parse_from(["mload", "--retry-forever"]).unwrap();
        let mut config = LoaderConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.retry, RetryPolicy::Unbounded);
    }

    #[test]
    fn test_retry_flags_conflict() {
        assert!(Cli::try_parse_from(["mload", "--retry-forever", "--max-attempts", "3"]).is_err());
    }
}
