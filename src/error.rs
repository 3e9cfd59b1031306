use std::path::PathBuf;

use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

/// Failure reported by the database driver while running a statement.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum QueryManagerError {
    #[error("Invalid query identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Query not found: {0}")]
    TemplateNotFound(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Parameter mismatch: statement expects {expected} parameter(s), {bound} bound")]
    ParameterMismatch { expected: usize, bound: usize },

    #[error("SQL execution error: {0}")]
    ExecutionError(#[from] DatabaseError),

    #[error("Transaction state error: {0}")]
    TransactionState(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to read template source {}: {source}", path.display())]
    TemplateSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for QueryManagerError {
    fn from(err: tokio_postgres::Error) -> Self {
        QueryManagerError::ExecutionError(DatabaseError::Postgres(err))
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for QueryManagerError {
    fn from(err: rusqlite::Error) -> Self {
        QueryManagerError::ExecutionError(DatabaseError::Sqlite(err))
    }
}

impl<E> From<bb8::RunError<E>> for QueryManagerError
where
    E: std::fmt::Display,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::TimedOut => QueryManagerError::ResourceUnavailable(
                "timed out waiting for a pooled connection".to_string(),
            ),
            bb8::RunError::User(e) => {
                QueryManagerError::ConnectionError(format!("pool checkout error: {e}"))
            }
        }
    }
}

impl QueryManagerError {
    /// True for errors raised by the database driver itself.
    #[must_use]
    pub fn is_execution(&self) -> bool {
        matches!(self, QueryManagerError::ExecutionError(_))
    }
}
