use postgresql_embedded::PostgreSQL;
use tracing::info;

use super::SHARED_RUNTIME;
use crate::pool::ConnectionManager;
use crate::postgres::{PostgresOptions, PostgresOptionsBuilder};

/// A running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    pub database_url: String,
    /// Connection options with the server's real host, port and credentials
    pub options: PostgresOptions,
}

/// Start an embedded server and create database `dbname` on it.
///
/// Blocks on a shared runtime, so call it outside any other runtime.
///
/// # Errors
/// Returns an error if the server cannot be set up or started, the database cannot be
/// created, or the post-start connectivity check fails.
pub fn setup_postgres_embedded(
    dbname: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(dbname).await?;

        let settings = postgresql.settings();
        let host = settings.host.clone();
        let port = settings.port;
        let user = settings.username.clone();
        let password = settings.password.clone();
        let database_url = format!("postgres://{user}:{password}@{host}:{port}/{dbname}");

        let options = PostgresOptionsBuilder::new()
            .host(host)
            .port(port)
            .user(user)
            .password(password)
            .dbname(dbname)
            .finish()?;

        let connections = ConnectionManager::new_postgres(options.clone()).await?;
        connections.acquire().await?.batch_execute("SELECT 1").await?;
        info!(port, "embedded postgres ready");

        Ok::<_, Box<dyn std::error::Error>>(EmbeddedPostgres {
            postgresql,
            port,
            database_url,
            options,
        })
    })
}

/// Stop a server started by [`setup_postgres_embedded`].
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
