use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bb8::ManageConnection;
use tokio::sync::Mutex;
use tracing::debug;

use super::executor::run_blocking;
use crate::error::QueryManagerError;
use crate::pool::ConnectFailures;

/// A rusqlite connection shared between the pool and blocking worker tasks.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// How long a connection waits on a locked database before reporting `SQLITE_BUSY`.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// bb8 manager for `SQLite` connections.
pub struct SqliteManager {
    db_path: String,
    failures: Arc<ConnectFailures>,
}

impl SqliteManager {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            failures: Arc::default(),
        }
    }

    pub(crate) fn failures(&self) -> Arc<ConnectFailures> {
        Arc::clone(&self.failures)
    }

    #[must_use]
    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

fn open(path: &str) -> Result<rusqlite::Connection, QueryManagerError> {
    let conn = rusqlite::Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(conn)
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = QueryManagerError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let path = self.db_path.clone();
        let failures = Arc::clone(&self.failures);
        async move {
            debug!(path = %path, "sqlite connect");
            let opened = tokio::task::spawn_blocking(move || open(&path))
                .await
                .map_err(|e| {
                    QueryManagerError::ConnectionError(format!("sqlite open join error: {e}"))
                })
                .and_then(|result| result);
            match opened {
                Ok(conn) => Ok(Arc::new(Mutex::new(conn))),
                Err(e) => {
                    failures.record(&e);
                    Err(e)
                }
            }
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            run_blocking(handle, |guard| {
                guard
                    .query_row("SELECT 1", [], |_| Ok(()))
                    .map_err(QueryManagerError::from)
            })
            .await
        }
    }

    /// A connection still inside a transaction, or still busy on a worker, must not be reused.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.try_lock()
            .map(|guard| !guard.is_autocommit())
            .unwrap_or(true)
    }
}
