use std::time::Duration;

use crate::error::QueryManagerError;

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: u32 = 10;
/// Default wait for a free connection before `ResourceUnavailable`.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Pool sizing shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Upper bound on open connections, and so on concurrent transactions
    pub max_size: u32,
    /// How long `acquire` waits for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_POOL_SIZE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl PoolOptions {
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    /// Read `QUERY_POOL_SIZE` and `QUERY_ACQUIRE_TIMEOUT_MS`, keeping defaults for unset keys.
    ///
    /// # Errors
    /// Returns `QueryManagerError::ConfigError` when a value is set but not a positive integer.
    pub fn from_env() -> Result<Self, QueryManagerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, QueryManagerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();
        if let Some(size) = parse_positive(&lookup, "QUERY_POOL_SIZE")? {
            opts.max_size = u32::try_from(size).map_err(|_| {
                QueryManagerError::ConfigError("QUERY_POOL_SIZE is too large".to_string())
            })?;
        }
        if let Some(ms) = parse_positive(&lookup, "QUERY_ACQUIRE_TIMEOUT_MS")? {
            opts.acquire_timeout = Duration::from_millis(ms);
        }
        Ok(opts)
    }

    /// Start a bb8 builder carrying these limits.
    ///
    /// Failed connection opens are not retried; `acquire` reports them as
    /// `ConnectionError` instead of waiting out the timeout.
    pub(crate) fn builder<M: bb8::ManageConnection>(&self) -> bb8::Builder<M> {
        bb8::Pool::builder()
            .max_size(self.max_size)
            .connection_timeout(self.acquire_timeout)
            .retry_connection(false)
    }
}

pub(crate) fn parse_positive<F>(lookup: &F, key: &str) -> Result<Option<u64>, QueryManagerError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(Some(value)),
            _ => Err(QueryManagerError::ConfigError(format!(
                "{key} must be a positive integer, got {raw:?}"
            ))),
        },
    }
}
