// PostgreSQL backend
//
// - config: pool options and `ConnectionManager` construction
// - manager: bb8 connection manager for `tokio_postgres` clients
// - params: `ToSql` for `RowValues`
// - query: statement execution and result extraction

pub mod config;
pub mod manager;
pub mod params;
pub mod query;

pub use config::{PostgresOptions, PostgresOptionsBuilder};
pub use manager::{PgConnection, PgManager};
pub use params::Params;
pub use query::{build_result_set_from_statement, execute_query_on_client};
