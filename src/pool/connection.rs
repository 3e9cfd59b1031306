use bb8::PooledConnection;
use tracing::warn;

#[cfg(feature = "postgres")]
use crate::postgres::{self, PgManager};
#[cfg(feature = "sqlite")]
use crate::sqlite::{self, SqliteManager};

use crate::error::QueryManagerError;
use crate::results::ResultSet;
#[cfg(feature = "postgres")]
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::RowValues;

/// A connection checked out of a [`ConnectionManager`](super::ConnectionManager).
///
/// Dropping it returns the connection to the pool.
pub enum PoolConnection {
    #[cfg(feature = "postgres")]
    Postgres {
        client: PooledConnection<'static, PgManager>,
        translate_placeholders: bool,
    },
    #[cfg(feature = "sqlite")]
    Sqlite {
        conn: PooledConnection<'static, SqliteManager>,
        translate_placeholders: bool,
    },
}

// Manual Debug implementation because pooled connections do not expose `Debug`
impl std::fmt::Debug for PoolConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres {
                translate_placeholders,
                ..
            } => f
                .debug_struct("Postgres")
                .field("translate_placeholders", translate_placeholders)
                .finish_non_exhaustive(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite {
                translate_placeholders,
                ..
            } => f
                .debug_struct("Sqlite")
                .field("translate_placeholders", translate_placeholders)
                .finish_non_exhaustive(),
        }
    }
}

impl PoolConnection {
    /// Run one statement with positional parameters and collect its rows.
    ///
    /// Statements that produce no columns report the affected row count instead.
    ///
    /// # Errors
    /// Returns `QueryManagerError::ExecutionError` for driver failures.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, QueryManagerError> {
        match self {
            #[cfg(feature = "postgres")]
            PoolConnection::Postgres {
                client,
                translate_placeholders: translate,
            } => {
                let sql = translate_placeholders(sql, PlaceholderStyle::Postgres, *translate);
                postgres::execute_query_on_client(client, &sql, params).await
            }
            #[cfg(feature = "sqlite")]
            PoolConnection::Sqlite {
                conn,
                translate_placeholders,
            } => sqlite::execute_query(conn, sql, params, *translate_placeholders).await,
        }
    }

    /// Run parameterless SQL such as `BEGIN`, `COMMIT` or DDL.
    ///
    /// # Errors
    /// Returns `QueryManagerError::ExecutionError` for driver failures.
    pub async fn batch_execute(&mut self, sql: &str) -> Result<(), QueryManagerError> {
        match self {
            #[cfg(feature = "postgres")]
            PoolConnection::Postgres { client, .. } => {
                client.batch_execute(sql).await?;
                Ok(())
            }
            #[cfg(feature = "sqlite")]
            PoolConnection::Sqlite { conn, .. } => sqlite::execute_batch(conn, sql).await,
        }
    }

    /// Give up a connection whose transaction was never finished.
    ///
    /// Postgres gets a `ROLLBACK` on the current runtime before the connection returns to the
    /// pool; without a runtime, or if that rollback fails, the client is discarded. `SQLite`
    /// connections outside autocommit are reported broken and discarded by the pool instead.
    pub(crate) fn abandon_transaction(self) {
        match self {
            #[cfg(feature = "postgres")]
            PoolConnection::Postgres { mut client, .. } => {
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            if let Err(e) = client.batch_execute("ROLLBACK").await {
                                warn!(error = %e, "rollback of abandoned transaction failed");
                                client.mark_abandoned();
                            }
                        });
                    }
                    Err(_) => {
                        warn!("no runtime to roll back a postgres transaction; discarding client");
                        client.mark_abandoned();
                    }
                }
            }
            #[cfg(feature = "sqlite")]
            PoolConnection::Sqlite { conn, .. } => drop(conn),
        }
    }
}
