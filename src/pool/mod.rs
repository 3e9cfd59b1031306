//! Connection Manager: a bounded bb8 pool handing out transient connections for single
//! statements and exclusive connections for transactions.

pub mod connection;

use std::fmt;
use std::sync::{Arc, Mutex};

use bb8::{ManageConnection, Pool, PooledConnection};
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, warn};

#[cfg(feature = "postgres")]
use crate::postgres::PgManager;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteManager;

use crate::error::QueryManagerError;
use crate::types::DatabaseType;

pub use connection::PoolConnection;

/// Connection pool for one of the supported engines.
#[derive(Clone)]
pub enum DbPool {
    /// `PostgreSQL` connection pool
    #[cfg(feature = "postgres")]
    Postgres(Pool<PgManager>),
    /// `SQLite` connection pool
    #[cfg(feature = "sqlite")]
    Sqlite(Pool<SqliteManager>),
}

// Manual Debug implementation because bb8 managers do not implement `Debug`
impl fmt::Debug for DbPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => f.debug_tuple("Postgres").field(&pool.state()).finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => f.debug_tuple("Sqlite").field(&pool.state()).finish(),
        }
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Connections currently open, checked out or idle
    pub connections: u32,
    /// Connections sitting idle in the pool
    pub idle_connections: u32,
}

/// Hands out pooled connections.
///
/// Cloning is cheap: clones share the same underlying pool.
#[derive(Clone, Debug)]
pub struct ConnectionManager {
    pool: DbPool,
    translate_placeholders: bool,
    failures: Arc<ConnectFailures>,
}

/// Connection-open failures reported by a backend manager.
///
/// bb8 passes connect errors to its error sink, not to waiting checkouts. Managers record
/// them here and `acquire` fails on the first one.
#[derive(Debug, Default)]
pub(crate) struct ConnectFailures {
    last: Mutex<Option<String>>,
    notify: Notify,
}

impl ConnectFailures {
    pub(crate) fn record(&self, error: &dyn fmt::Display) {
        warn!(error = %error, "failed to open a database connection");
        if let Ok(mut last) = self.last.lock() {
            *last = Some(error.to_string());
        }
        self.notify.notify_waiters();
    }

    fn error(&self) -> QueryManagerError {
        let detail = self
            .last
            .lock()
            .ok()
            .and_then(|last| last.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        QueryManagerError::ConnectionError(format!("cannot open a database connection: {detail}"))
    }
}

async fn checkout<M>(
    pool: &Pool<M>,
    failures: &ConnectFailures,
) -> Result<PooledConnection<'static, M>, QueryManagerError>
where
    M: ManageConnection,
    M::Error: fmt::Display,
{
    let failed = failures.notify.notified();
    tokio::pin!(failed);
    failed.as_mut().enable();
    tokio::select! {
        biased;
        conn = pool.get_owned() => conn.map_err(QueryManagerError::from),
        () = &mut failed => Err(failures.error()),
    }
}

impl ConnectionManager {
    /// Wrap an already built pool.
    ///
    /// `translate_placeholders` rewrites `$N` markers to `?N` on `SQLite` connections, and
    /// `?N` markers to `$N` on Postgres connections.
    #[must_use]
    pub fn from_pool(pool: DbPool, translate_placeholders: bool) -> Self {
        Self {
            pool,
            translate_placeholders,
            failures: Arc::default(),
        }
    }

    /// Share the failure log the pool's manager writes to.
    pub(crate) fn with_failures(mut self, failures: Arc<ConnectFailures>) -> Self {
        self.failures = failures;
        self
    }

    #[must_use]
    pub fn db_type(&self) -> DatabaseType {
        match &self.pool {
            #[cfg(feature = "postgres")]
            DbPool::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(_) => DatabaseType::Sqlite,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Check a connection out of the pool. It goes back when the returned value is dropped.
    ///
    /// Waits up to the pool's acquire timeout when every connection is in use.
    ///
    /// # Errors
    /// Returns `QueryManagerError::ResourceUnavailable` when the wait times out, or
    /// `QueryManagerError::ConnectionError` as soon as opening a new connection fails.
    pub async fn acquire(&self) -> Result<PoolConnection, QueryManagerError> {
        let conn = match &self.pool {
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => PoolConnection::Postgres {
                client: checkout(pool, &self.failures).await?,
                translate_placeholders: self.translate_placeholders,
            },
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(pool) => PoolConnection::Sqlite {
                conn: checkout(pool, &self.failures).await?,
                translate_placeholders: self.translate_placeholders,
            },
        };
        debug!(status = ?self.status(), "connection acquired");
        Ok(conn)
    }

    /// Check out a connection and open a transaction on it.
    ///
    /// The connection stays reserved until the caller commits or rolls back.
    ///
    /// # Errors
    /// Returns the acquisition errors of [`acquire`](Self::acquire), or
    /// `QueryManagerError::ExecutionError` if `BEGIN` fails (the connection is released).
    pub async fn begin(&self) -> Result<PoolConnection, QueryManagerError> {
        let mut conn = self.acquire().await?;
        conn.batch_execute("BEGIN").await?;
        debug!("transaction started");
        Ok(conn)
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = match &self.pool {
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => pool.state(),
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(pool) => pool.state(),
        };
        PoolStatus {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }
}
