use std::sync::LazyLock;
use tokio::runtime::Runtime;

/// Runtime shared by the test helpers so setup and teardown do not each build one
pub(crate) static SHARED_RUNTIME: LazyLock<Runtime> =
    LazyLock::new(|| Runtime::new().expect("Failed to create tokio runtime for test utilities"));

/// Embedded `PostgreSQL` server for integration tests
pub mod postgres;

pub use postgres::{EmbeddedPostgres, setup_postgres_embedded, stop_postgres_embedded};
