//! The stateful execution unit.
//!
//! A [`Query`] holds the active SQL text, its positional parameters and the rest of its
//! template chain. Without a transaction every statement borrows a pooled connection for the
//! duration of one round trip. A transaction-bound query owns a single connection from
//! `BEGIN` until `commit`/`rollback`, or until it is dropped.

pub mod interpolate;
pub mod transaction;

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, error, warn};

pub use interpolate::{MARKER_CLOSE, MARKER_OPEN, interpolate_marker, sanitize_marker_name};
pub use transaction::TransactionState;
pub(crate) use transaction::TxConnection;

use crate::count::derive_count_sql;
use crate::error::QueryManagerError;
use crate::pool::{ConnectionManager, PoolConnection};
use crate::results::ResultSet;
use crate::translation::max_placeholder;
use crate::types::RowValues;

/// Column read by [`Query::execute`] as the generated identifier.
pub const GENERATED_ID_COLUMN: &str = "id";
/// Column produced by the derived count statement.
pub const COUNT_COLUMN: &str = "total";

/// SQL text and bound parameters, executed against the pool or a reserved connection.
///
/// ```rust,no_run
/// # use sql_query_manager::prelude::*;
/// # async fn page(manager: &QueryManager) -> Result<(), QueryManagerError> {
/// let mut query = manager.get_query("transactions.list-by-user")?;
/// query.bind([RowValues::Int(42)]);
/// let total = query.count().await?;
/// let rows = query.interpolate("order", "DESC").fetch().await?;
/// # let _ = (total, rows);
/// # Ok(())
/// # }
/// ```
pub struct Query {
    sql: String,
    params: Vec<RowValues>,
    chain: VecDeque<String>,
    connections: ConnectionManager,
    tx: Option<TxConnection>,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("remaining", &self.chain.len())
            .field("transaction", &self.transaction_state())
            .finish_non_exhaustive()
    }
}

impl Query {
    pub(crate) fn new(
        sql: String,
        chain: VecDeque<String>,
        connections: ConnectionManager,
    ) -> Self {
        Self {
            sql,
            params: Vec::new(),
            chain,
            connections,
            tx: None,
        }
    }

    /// Bind the query to a connection that has already run `BEGIN`.
    pub(crate) fn with_transaction(mut self, conn: PoolConnection) -> Self {
        self.tx = Some(TxConnection::open(conn));
        self
    }

    /// Replace the positional parameters; values go to `$1`, `$2`, … in order.
    pub fn bind<I, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Substitute `value` for every `{{name}}` marker in the active SQL.
    ///
    /// `name` is reduced to `[A-Za-z0-9_]` before matching and unmatched markers are left
    /// alone. The value is pasted into the SQL text verbatim, so it must come from code,
    /// never from a request.
    pub fn interpolate(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        if let Some(sql) = interpolate_marker(&self.sql, name, &value.to_string()) {
            self.sql = sql;
        }
        self
    }

    /// Make the next template of the chain active.
    ///
    /// Returns `false` when the chain is exhausted. Bound parameters are kept; rebind them
    /// for the new statement.
    ///
    /// # Errors
    /// Returns `QueryManagerError::TransactionState` once the transaction has finished.
    pub fn next_query(&mut self) -> Result<bool, QueryManagerError> {
        self.ensure_usable("advance")?;
        Ok(match self.chain.pop_front() {
            Some(sql) => {
                self.sql = sql;
                true
            }
            None => false,
        })
    }

    /// Run the active statement and return the `id` column of its first row, if any.
    ///
    /// Use `RETURNING id` to get generated keys back from an insert.
    ///
    /// # Errors
    /// Returns `ParameterMismatch` when the bound parameters do not cover the statement's
    /// markers, `TransactionState` after the transaction finished, pool errors, or
    /// `ExecutionError` from the database.
    pub async fn execute(&mut self) -> Result<Option<RowValues>, QueryManagerError> {
        let result = self.run("execute").await?;
        Ok(result
            .into_first()
            .and_then(|row| row.get(GENERATED_ID_COLUMN).cloned())
            .filter(|id| !id.is_null()))
    }

    /// Run the active statement and return every row.
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute).
    pub async fn fetch(&mut self) -> Result<ResultSet, QueryManagerError> {
        self.run("fetch").await
    }

    /// Count the rows the active `SELECT` would return without its ordering and paging.
    ///
    /// Call this before interpolating anything that removes the filter. Only the parameters
    /// referenced by the derived statement are bound.
    ///
    /// # Errors
    /// Returns `MalformedQuery` when the active SQL has no `FROM`, plus the errors of
    /// [`execute`](Self::execute).
    pub async fn count(&mut self) -> Result<i64, QueryManagerError> {
        self.ensure_usable("count")?;
        let count_sql = derive_count_sql(&self.sql)?;
        let expected = max_placeholder(&count_sql);
        if expected > self.params.len() {
            return Err(QueryManagerError::ParameterMismatch {
                expected,
                bound: self.params.len(),
            });
        }
        let Query {
            params,
            connections,
            tx,
            ..
        } = self;
        let result = run_statement(
            connections,
            tx.as_mut(),
            "count",
            &count_sql,
            &params[..expected],
        )
        .await?;
        Ok(read_total(&result))
    }

    /// Commit the transaction and release its connection.
    ///
    /// When `COMMIT` fails one `ROLLBACK` is attempted and the commit error is returned. On a
    /// query without a transaction this only logs a warning.
    ///
    /// # Errors
    /// Returns the commit's `ExecutionError`, or `TransactionState` if already finished.
    pub async fn commit(&mut self) -> Result<(), QueryManagerError> {
        let Some(tx) = self.tx.as_mut() else {
            warn!("commit called on a query without a transaction");
            return Ok(());
        };
        let conn = tx.live("commit")?;
        match conn.batch_execute("COMMIT").await {
            Ok(()) => {
                drop(tx.finish(TransactionState::Committed));
                debug!(status = ?self.connections.status(), "transaction committed");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "commit failed, rolling back");
                let rolled_back = conn.batch_execute("ROLLBACK").await;
                let released = tx.finish(TransactionState::RolledBack);
                if let Err(rollback_err) = rolled_back {
                    warn!(error = %rollback_err, "rollback after failed commit also failed");
                    if let Some(conn) = released {
                        conn.abandon_transaction();
                    }
                }
                Err(err)
            }
        }
    }

    /// Roll the transaction back and release its connection.
    ///
    /// Driver errors during `ROLLBACK` are logged, not returned. On a query without a
    /// transaction this only logs a warning.
    ///
    /// # Errors
    /// Returns `TransactionState` if the transaction already finished.
    pub async fn rollback(&mut self) -> Result<(), QueryManagerError> {
        let Some(tx) = self.tx.as_mut() else {
            warn!("rollback called on a query without a transaction");
            return Ok(());
        };
        let outcome = tx.live("rollback")?.batch_execute("ROLLBACK").await;
        let released = tx.finish(TransactionState::RolledBack);
        match outcome {
            Ok(()) => {
                drop(released);
                debug!(status = ?self.connections.status(), "transaction rolled back");
            }
            Err(err) => {
                warn!(error = %err, "rollback failed");
                if let Some(conn) = released {
                    conn.abandon_transaction();
                }
            }
        }
        Ok(())
    }

    /// The active SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &[RowValues] {
        &self.params
    }

    /// Templates left in the chain after the active one.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    #[must_use]
    pub fn is_transaction(&self) -> bool {
        self.tx.is_some()
    }

    #[must_use]
    pub fn transaction_state(&self) -> Option<TransactionState> {
        self.tx.as_ref().map(|tx| tx.state)
    }

    /// True while a transaction is bound and neither committed nor rolled back.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transaction_state() == Some(TransactionState::Open)
    }

    fn ensure_usable(&mut self, operation: &str) -> Result<(), QueryManagerError> {
        if let Some(tx) = self.tx.as_mut() {
            tx.live(operation)?;
        }
        Ok(())
    }

    async fn run(&mut self, operation: &str) -> Result<ResultSet, QueryManagerError> {
        self.ensure_usable(operation)?;
        let expected = max_placeholder(&self.sql);
        if expected != self.params.len() {
            return Err(QueryManagerError::ParameterMismatch {
                expected,
                bound: self.params.len(),
            });
        }
        let Query {
            sql,
            params,
            connections,
            tx,
            ..
        } = self;
        run_statement(connections, tx.as_mut(), operation, sql, params).await
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.as_mut()
            && tx.state == TransactionState::Open
            && let Some(conn) = tx.finish(TransactionState::RolledBack)
        {
            warn!(sql = %self.sql, "open transaction dropped, rolling back");
            conn.abandon_transaction();
        }
    }
}

/// Run one statement on the transaction's connection, or on a pooled one released right
/// after the round trip.
async fn run_statement(
    connections: &ConnectionManager,
    tx: Option<&mut TxConnection>,
    operation: &str,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, QueryManagerError> {
    let result = match tx {
        Some(tx) => tx.live(operation)?.query(sql, params).await,
        None => {
            let mut conn = connections.acquire().await?;
            conn.query(sql, params).await
        }
    };
    if let Err(err) = &result {
        error!(error = %err, sql, operation, "statement failed");
    }
    result
}

fn read_total(result: &ResultSet) -> i64 {
    result
        .first()
        .and_then(|row| row.get(COUNT_COLUMN).or_else(|| row.get_by_index(0)))
        .and_then(|value| match value {
            RowValues::Int(total) => Some(*total),
            RowValues::Text(text) => text.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}
