use crate::config::PoolOptions;
use crate::error::QueryManagerError;
use crate::pool::{ConnectionManager, DbPool};

use super::SqliteManager;

/// Options for configuring a `SQLite` pool.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    /// Rewrite `$N` markers to `?N` before preparing statements
    pub translate_placeholders: bool,
    pub pool: PoolOptions,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            translate_placeholders: true,
            pool: PoolOptions::default(),
        }
    }

    #[must_use]
    pub fn with_translation(mut self, translate_placeholders: bool) -> Self {
        self.translate_placeholders = translate_placeholders;
        self
    }

    #[must_use]
    pub fn with_pool(mut self, pool: PoolOptions) -> Self {
        self.pool = pool;
        self
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn translation(mut self, translate_placeholders: bool) -> Self {
        self.opts.translate_placeholders = translate_placeholders;
        self
    }

    #[must_use]
    pub fn pool(mut self, pool: PoolOptions) -> Self {
        self.opts.pool = pool;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a `ConnectionManager` for `SQLite`.
    ///
    /// # Errors
    /// Returns `QueryManagerError` if pool creation or the initial smoke test fails.
    pub async fn build(self) -> Result<ConnectionManager, QueryManagerError> {
        ConnectionManager::new_sqlite(self.finish()).await
    }
}

impl ConnectionManager {
    #[must_use]
    pub fn sqlite_builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Asynchronous initializer for a `SQLite`-backed `ConnectionManager`.
    ///
    /// One connection is opened up front so a bad path or locked file fails here rather than
    /// on the first query.
    ///
    /// # Errors
    /// Returns `QueryManagerError::ConnectionError` if pool creation or the connection test fails.
    pub async fn new_sqlite(opts: SqliteOptions) -> Result<Self, QueryManagerError> {
        let manager = SqliteManager::new(opts.db_path.clone());
        let failures = manager.failures();
        let pool = opts.pool.builder().build(manager).await.map_err(|e| {
            QueryManagerError::ConnectionError(format!("Failed to create SQLite pool: {e}"))
        })?;
        let connections =
            ConnectionManager::from_pool(DbPool::Sqlite(pool), opts.translate_placeholders)
                .with_failures(failures);

        {
            let _conn = connections.acquire().await.map_err(|e| {
                QueryManagerError::ConnectionError(format!(
                    "Failed to open SQLite database {}: {e}",
                    opts.db_path
                ))
            })?;
        }

        Ok(connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn translation_defaults_on() {
        let opts = SqliteOptions::new("app.db");
        assert!(opts.translate_placeholders);
        assert_eq!(opts.pool, PoolOptions::default());
    }

    #[test]
    fn builder_collects_settings() {
        let opts = ConnectionManager::sqlite_builder("app.db")
            .translation(false)
            .pool(PoolOptions::default().with_acquire_timeout(Duration::from_millis(50)))
            .finish();
        assert!(!opts.translate_placeholders);
        assert_eq!(opts.pool.acquire_timeout, Duration::from_millis(50));
        assert_eq!(opts.db_path, "app.db");
    }
}
