use std::sync::Arc;

use rusqlite::params_from_iter;

use super::manager::SharedSqliteConnection;
use super::params::Params;
use super::query::build_result_set;
use crate::error::{DatabaseError, QueryManagerError};
use crate::results::ResultSet;
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::{ParamConverter, RowValues};

/// Run `func` against the connection on the blocking thread pool.
///
/// # Errors
/// Returns whatever `func` returns, or `ExecutionError` if the worker task panicked.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, QueryManagerError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, QueryManagerError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| {
        QueryManagerError::ExecutionError(DatabaseError::Other(format!(
            "sqlite spawn_blocking join error: {e}"
        )))
    })?
}

/// Execute parameterless SQL (possibly several statements) in `SQLite`.
///
/// # Errors
/// Returns `QueryManagerError::ExecutionError` if execution fails.
pub async fn execute_batch(
    conn: &SharedSqliteConnection,
    query: &str,
) -> Result<(), QueryManagerError> {
    let query = query.to_string();
    run_blocking(Arc::clone(conn), move |guard| {
        guard.execute_batch(&query).map_err(QueryManagerError::from)
    })
    .await
}

/// Execute one statement with positional parameters in `SQLite`.
///
/// `$N` markers are rewritten to `?N` first when `translate` is set. Statements without
/// result columns report the number of changed rows.
///
/// # Errors
/// Returns `QueryManagerError::ExecutionError` if preparation or execution fails.
pub async fn execute_query(
    conn: &SharedSqliteConnection,
    query: &str,
    params: &[RowValues],
    translate: bool,
) -> Result<ResultSet, QueryManagerError> {
    let query = translate_placeholders(query, PlaceholderStyle::Sqlite, translate).into_owned();
    let values = Params::convert_sql_params(params)?;
    run_blocking(Arc::clone(conn), move |guard| {
        let mut stmt = guard.prepare(&query)?;
        if stmt.column_count() == 0 {
            let changed = stmt.execute(params_from_iter(values.as_values()))?;
            return Ok(ResultSet::affected(changed));
        }
        build_result_set(&mut stmt, values.as_values())
    })
    .await
}
