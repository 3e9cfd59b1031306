//! Template-driven, transactional SQL execution.
//!
//! SQL lives in `.sql` files as named templates. A [`QueryManager`] resolves
//! `"namespace.id"` identifiers against a [`TemplateStore`] and hands out [`Query`] values
//! that bind parameters, run on a bounded bb8 pool, derive `COUNT(*)` statements for
//! pagination, and carry commit/rollback state when bound to a transaction.
//!
//! ```sql
//! -- list-by-user
//! SELECT id, amount, date
//!   FROM transactions
//!  WHERE user_id = $1
//!  ORDER BY {{column}} {{order}}
//!  LIMIT $2 OFFSET $3;
//! ```
//!
//! Backends: `PostgreSQL` through tokio-postgres (`postgres` feature) and `SQLite` through
//! rusqlite (`sqlite` feature). Templates use `$N` markers for both.

pub mod config;
pub mod count;
pub mod error;
pub mod manager;
pub mod pool;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod prelude;
pub mod query;
pub mod results;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod template;
#[cfg(feature = "test-utils")]
pub mod test_utils;
pub mod translation;
pub mod types;
pub mod validation;

pub use config::PoolOptions;
pub use count::derive_count_sql;
pub use error::{DatabaseError, QueryManagerError};
pub use manager::QueryManager;
pub use pool::{ConnectionManager, DbPool, PoolConnection, PoolStatus};
pub use query::{Query, TransactionState};
pub use results::{DbRow, ResultSet};
pub use template::{QueryIds, TemplateId, TemplateStore};
pub use translation::{PlaceholderStyle, max_placeholder, translate_placeholders};
pub use types::{DatabaseType, RowValues};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresOptions, PostgresOptionsBuilder};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteOptions, SqliteOptionsBuilder};
