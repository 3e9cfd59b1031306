use crate::config::{PoolOptions, parse_positive};
use crate::error::QueryManagerError;
use crate::pool::{ConnectionManager, DbPool};

use super::PgManager;

/// Options for configuring a Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    pub config: tokio_postgres::Config,
    /// Rewrite `?N` markers to `$N` so SQLite-style templates run unchanged
    pub translate_placeholders: bool,
    pub pool: PoolOptions,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self {
            config,
            translate_placeholders: false,
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

    /// Parse a libpq-style connection string or `postgres://` URL.
    ///
    /// # Errors
    /// Returns `QueryManagerError::ConfigError` if the string cannot be parsed.
    pub fn from_url(url: &str) -> Result<Self, QueryManagerError> {
        let config = url.parse::<tokio_postgres::Config>().map_err(|e| {
            QueryManagerError::ConfigError(format!("invalid postgres connection string: {e}"))
        })?;
        Ok(Self::new(config))
    }

    /// Build options from `DATABASE_HOST`, `DATABASE_USER`, `DATABASE_PASSWORD`,
    /// `DATABASE_NAME`, `DATABASE_PORT` (default 5432) and the pool variables read by
    /// [`PoolOptions::from_env`].
    ///
    /// # Errors
    /// Returns `QueryManagerError::ConfigError` if a required variable is missing or a number
    /// does not parse.
    pub fn from_env() -> Result<Self, QueryManagerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, QueryManagerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| QueryManagerError::ConfigError(format!("{key} is required")))
        };
        let port = match parse_positive(&lookup, "DATABASE_PORT")? {
            Some(port) => u16::try_from(port).map_err(|_| {
                QueryManagerError::ConfigError(format!("DATABASE_PORT out of range: {port}"))
            })?,
            None => 5432,
        };

        let mut builder = PostgresOptionsBuilder::new()
            .host(required("DATABASE_HOST")?)
            .user(required("DATABASE_USER")?)
            .dbname(required("DATABASE_NAME")?)
            .port(port)
            .pool(PoolOptions::from_lookup(&lookup)?);
        if let Some(password) = lookup("DATABASE_PASSWORD") {
            builder = builder.password(password);
        }
        builder.finish()
    }
}

/// Fluent builder for Postgres options.
#[derive(Debug, Clone, Default)]
pub struct PostgresOptionsBuilder {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    dbname: Option<String>,
    translate_placeholders: bool,
    pool: PoolOptions,
}

impl PostgresOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = Some(dbname.into());
        self
    }

    #[must_use]
    pub fn translation(mut self, translate_placeholders: bool) -> Self {
        self.translate_placeholders = translate_placeholders;
        self
    }

    #[must_use]
    pub fn pool(mut self, pool: PoolOptions) -> Self {
        self.pool = pool;
        self
    }

    /// Validate the collected fields.
    ///
    /// # Errors
    /// Returns `QueryManagerError::ConfigError` if host, user, or dbname is missing.
    pub fn finish(self) -> Result<PostgresOptions, QueryManagerError> {
        let host = self
            .host
            .ok_or_else(|| QueryManagerError::ConfigError("host is required".to_string()))?;
        let user = self
            .user
            .ok_or_else(|| QueryManagerError::ConfigError("user is required".to_string()))?;
        let dbname = self
            .dbname
            .ok_or_else(|| QueryManagerError::ConfigError("dbname is required".to_string()))?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(&host)
            .port(self.port.unwrap_or(5432))
            .user(&user)
            .dbname(&dbname);
        if let Some(password) = &self.password {
            config.password(password);
        }
        Ok(PostgresOptions {
            config,
            translate_placeholders: self.translate_placeholders,
            pool: self.pool,
        })
    }

    /// Build a `ConnectionManager` for Postgres.
    ///
    /// # Errors
    /// Returns `QueryManagerError` if validation or pool creation fails.
    pub async fn build(self) -> Result<ConnectionManager, QueryManagerError> {
        ConnectionManager::new_postgres(self.finish()?).await
    }
}

impl ConnectionManager {
    #[must_use]
    pub fn postgres_builder() -> PostgresOptionsBuilder {
        PostgresOptionsBuilder::new()
    }

    /// Asynchronous initializer for a Postgres-backed `ConnectionManager`.
    ///
    /// Connections are opened lazily, on first checkout.
    ///
    /// # Errors
    /// Returns `QueryManagerError::ConnectionError` if pool creation fails.
    pub async fn new_postgres(opts: PostgresOptions) -> Result<Self, QueryManagerError> {
        let manager = PgManager::new(opts.config);
        let failures = manager.failures();
        let pool = opts.pool.builder().build(manager).await.map_err(|e| {
            QueryManagerError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
        })?;
        let connections =
            ConnectionManager::from_pool(DbPool::Postgres(pool), opts.translate_placeholders);
        Ok(connections.with_failures(failures))
    }
}
