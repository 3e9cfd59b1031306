use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::QueryManagerError;
use crate::pool::ConnectionManager;
use crate::query::Query;
use crate::results::DbRow;
use crate::template::{QueryIds, TemplateStore};
use crate::types::RowValues;

/// Entry point for services: resolves template identifiers and hands out [`Query`] values
/// bound to the pool.
///
/// Built explicitly and passed to whoever needs it; cloning shares the store and the pool.
///
/// ```rust,no_run
/// use sql_query_manager::prelude::*;
///
/// # async fn run() -> Result<(), QueryManagerError> {
/// let connections = ConnectionManager::sqlite_builder("app.db").build().await?;
/// let manager = QueryManager::from_dir("queries", connections)?;
///
/// let user = manager.get_one("users.find-by-id", [RowValues::Int(1)]).await?;
///
/// let mut tx = manager
///     .begin_transaction(["transactions.create", "transactions.add-to-category"])
///     .await?;
/// tx.bind([RowValues::Int(1), RowValues::Float(12.5)]);
/// let id = tx.execute().await?;
/// tx.next_query()?;
/// tx.bind([id.unwrap_or(RowValues::Null), RowValues::Int(3)]);
/// tx.execute().await?;
/// tx.commit().await?;
/// # let _ = user;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct QueryManager {
    store: Arc<TemplateStore>,
    connections: ConnectionManager,
}

impl QueryManager {
    #[must_use]
    pub fn new(store: impl Into<Arc<TemplateStore>>, connections: ConnectionManager) -> Self {
        Self {
            store: store.into(),
            connections,
        }
    }

    /// Load templates from every `*.sql` file in `dir`.
    ///
    /// # Errors
    /// Returns `QueryManagerError::TemplateSource` if the directory cannot be read.
    pub fn from_dir(
        dir: impl AsRef<Path>,
        connections: ConnectionManager,
    ) -> Result<Self, QueryManagerError> {
        Ok(Self::new(TemplateStore::load_dir(dir)?, connections))
    }

    #[must_use]
    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// A query over one template, or a chain when several identifiers are given.
    ///
    /// # Errors
    /// Returns `InvalidIdentifier` if any identifier is malformed (checked before any lookup),
    /// or `TemplateNotFound` for an unknown one.
    pub fn get_query<'a>(&self, ids: impl Into<QueryIds<'a>>) -> Result<Query, QueryManagerError> {
        let (sql, chain) = self.resolve(ids.into())?;
        Ok(Query::new(sql, chain, self.connections.clone()))
    }

    /// Fetch with `params` and return the first row, if any.
    ///
    /// # Errors
    /// Returns the errors of [`get_query`](Self::get_query) and [`Query::fetch`].
    pub async fn get_one<'a, I, V>(
        &self,
        id: impl Into<QueryIds<'a>>,
        params: I,
    ) -> Result<Option<DbRow>, QueryManagerError>
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        let mut query = self.get_query(id)?;
        Ok(query.bind(params).fetch().await?.into_first())
    }

    /// Reserve a connection, run `BEGIN` on it and return a query bound to it.
    ///
    /// Identifiers are resolved before a connection is taken from the pool.
    ///
    /// # Errors
    /// Returns identifier and template errors, `ResourceUnavailable` when no connection frees
    /// up within the acquire timeout, or `ExecutionError` if `BEGIN` fails.
    pub async fn begin_transaction<'a>(
        &self,
        ids: impl Into<QueryIds<'a>>,
    ) -> Result<Query, QueryManagerError> {
        let (sql, chain) = self.resolve(ids.into())?;
        let conn = self.connections.begin().await?;
        Ok(Query::new(sql, chain, self.connections.clone()).with_transaction(conn))
    }

    /// Run `work` inside a transaction.
    ///
    /// Commits when `work` returns `Ok` and rolls back when it returns `Err`, unless `work`
    /// already finished the transaction itself.
    ///
    /// # Errors
    /// Returns the error from `work`, or from beginning or committing the transaction.
    pub async fn transaction<'a, T, F>(
        &self,
        ids: impl Into<QueryIds<'a>>,
        work: F,
    ) -> Result<T, QueryManagerError>
    where
        F: AsyncFnOnce(&mut Query) -> Result<T, QueryManagerError>,
    {
        let mut query = self.begin_transaction(ids).await?;
        match work(&mut query).await {
            Ok(value) => {
                if query.is_open() {
                    query.commit().await?;
                }
                Ok(value)
            }
            Err(err) => {
                if query.is_open() {
                    debug!(error = %err, "transaction body failed, rolling back");
                    if let Err(rollback_err) = query.rollback().await {
                        warn!(
                            error = %rollback_err,
                            "rollback after failed transaction body failed"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    fn resolve(&self, ids: QueryIds<'_>) -> Result<(String, VecDeque<String>), QueryManagerError> {
        let mut templates = ids
            .parse_all()?
            .iter()
            .map(|id| self.store.get(id).map(str::to_string))
            .collect::<Result<VecDeque<_>, _>>()?;
        let first = templates.pop_front().ok_or_else(|| {
            QueryManagerError::InvalidIdentifier("empty query chain".to_string())
        })?;
        Ok((first, templates))
    }
}
