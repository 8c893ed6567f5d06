//! Destination store for movie records
//!
//! [`MovieStore`] is the seam between the worker pool and the database: one
//! call performs one insert attempt. [`MySqlMovieStore`] is the production
//! implementation; tests substitute in-memory stores.

use async_trait::async_trait;
use mload_common::Movie;
use sqlx::mysql::{MySqlDatabaseError, MySqlPool};
use thiserror::Error;

/// Positional insert; `rank` is a reserved word in MySQL 8 and must be quoted.
pub const INSERT_MOVIE_SQL: &str = "INSERT INTO movie (id, title, `rank`) VALUES (?, ?, ?)";

/// MySQL error numbers worth another attempt
const TRANSIENT_MYSQL_ERRORS: &[u16] = &[
    1205, // ER_LOCK_WAIT_TIMEOUT
    1213, // ER_LOCK_DEADLOCK
    1040, // ER_CON_COUNT_ERROR
    1053, // ER_SERVER_SHUTDOWN
];

/// Why a single insert attempt failed
#[derive(Error, Debug)]
pub enum InsertFault {
    #[error("Failed to acquire database connection: {0}")]
    ConnectionAcquisition(#[source] sqlx::Error),

    #[error("Insert statement failed: {0}")]
    StatementExecution(#[source] sqlx::Error),

    #[error("Failed to release database connection: {0}")]
    ConnectionRelease(#[source] sqlx::Error),

    /// The destination already holds a row with this id
    #[error("Movie '{id}' already exists")]
    DuplicateKey { id: String },
}

impl InsertFault {
    /// Map a statement error, singling out unique-key violations.
    pub fn from_statement_error(err: sqlx::Error, id: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::DuplicateKey { id: id.to_string() }
            },
            _ => Self::StatementExecution(err),
        }
    }

    /// Whether another attempt could succeed without operator intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DuplicateKey { .. } => false,
            Self::ConnectionAcquisition(err)
            | Self::StatementExecution(err)
            | Self::ConnectionRelease(err) => is_transient(err),
        }
    }

    /// Short stable label for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionAcquisition(_) => "connection_acquisition",
            Self::StatementExecution(_) => "statement_execution",
            Self::ConnectionRelease(_) => "connection_release",
            Self::DuplicateKey { .. } => "duplicate_key",
        }
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => {
            if let Some(mysql) = db.try_downcast_ref::<MySqlDatabaseError>() {
                if TRANSIENT_MYSQL_ERRORS.contains(&mysql.number()) {
                    return true;
                }
            }
            // 40001 serialization failure, 08xxx connection exceptions
            db.code()
                .is_some_and(|code| code == "40001" || code.starts_with("08"))
        },
        _ => false,
    }
}

/// One insert attempt per call
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Acquire a connection, insert `movie`, release the connection.
    async fn insert(&self, movie: &Movie) -> Result<(), InsertFault>;
}

/// Inserts into the `movie` table through a shared sqlx pool
#[derive(Debug, Clone)]
pub struct MySqlMovieStore {
    pool: MySqlPool,
}

impl MySqlMovieStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovieStore for MySqlMovieStore {
    async fn insert(&self, movie: &Movie) -> Result<(), InsertFault> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(InsertFault::ConnectionAcquisition)?;

        sqlx::query(INSERT_MOVIE_SQL)
            .bind(&movie.id)
            .bind(&movie.title)
            .bind(&movie.rank)
            .execute(&mut *conn)
            .await
            .map_err(|e| InsertFault::from_statement_error(e, &movie.id))?;

        // Returning a pooled connection happens on drop and cannot fail.
        drop(conn);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;

    #[derive(Debug)]
    struct FakeDbError {
        unique: bool,
        code: Option<&'static str>,
    }

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "fake database error")
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    fn db_error(unique: bool, code: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError { unique, code }))
    }

    #[test]
    fn test_unique_violation_becomes_duplicate_key() {
        let fault = InsertFault::from_statement_error(db_error(true, Some("23000")), "tt01");
        assert!(matches!(fault, InsertFault::DuplicateKey { ref id } if id == "tt01"));
        assert!(!fault.is_retryable());
        assert_eq!(fault.to_string(), "Movie 'tt01' already exists");
    }

    #[test]
    fn test_serialization_failure_is_retryable() {
        let fault = InsertFault::from_statement_error(db_error(false, Some("40001")), "tt01");
        assert!(matches!(fault, InsertFault::StatementExecution(_)));
        assert!(fault.is_retryable());
    }

    #[test]
    fn test_schema_error_is_terminal() {
        // 42S02: table does not exist
        let fault = InsertFault::from_statement_error(db_error(false, Some("42S02")), "tt01");
        assert!(!fault.is_retryable());
        assert_eq!(fault.kind(), "statement_execution");
    }

    #[test]
    fn test_pool_faults() {
        assert!(InsertFault::ConnectionAcquisition(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!InsertFault::ConnectionAcquisition(sqlx::Error::PoolClosed).is_retryable());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(InsertFault::ConnectionRelease(sqlx::Error::Io(io)).is_retryable());
    }

    #[test]
    fn test_insert_statement_quotes_rank() {
        assert!(INSERT_MOVIE_SQL.contains("`rank`"));
        assert_eq!(INSERT_MOVIE_SQL.matches('?').count(), 3);
    }
}
