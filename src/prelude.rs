//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_query_manager::prelude::*;
//! ```

pub use crate::config::PoolOptions;
pub use crate::error::{DatabaseError, QueryManagerError};
pub use crate::manager::QueryManager;
pub use crate::pool::{ConnectionManager, PoolStatus};
pub use crate::query::{Query, TransactionState};
pub use crate::results::{DbRow, ResultSet};
pub use crate::template::{QueryIds, TemplateId, TemplateStore};
pub use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresOptions, PostgresOptionsBuilder};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder};
