use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use bb8::ManageConnection;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::pool::ConnectFailures;

/// bb8 manager for Postgres clients.
pub struct PgManager {
    pub(crate) config: tokio_postgres::Config,
    failures: Arc<ConnectFailures>,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self {
            config,
            failures: Arc::default(),
        }
    }

    pub(crate) fn failures(&self) -> Arc<ConnectFailures> {
        Arc::clone(&self.failures)
    }
}

/// A pooled Postgres client.
///
/// A client marked abandoned still has an open transaction nobody will finish; the pool
/// discards it on return instead of handing it out again.
pub struct PgConnection {
    client: Client,
    abandoned: bool,
}

impl PgConnection {
    pub(crate) fn mark_abandoned(&mut self) {
        self.abandoned = true;
    }

    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }
}

impl Deref for PgConnection {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.client
    }
}

impl DerefMut for PgConnection {
    fn deref_mut(&mut self) -> &mut Client {
        &mut self.client
    }
}

impl ManageConnection for PgManager {
    type Connection = PgConnection;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        let failures = Arc::clone(&self.failures);
        async move {
            debug!(
                hosts = ?cfg.get_hosts(),
                db = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                "postgres connect start"
            );
            let (client, connection) = match cfg.connect(NoTls).await {
                Ok(pair) => pair,
                Err(e) => {
                    failures.record(&e);
                    return Err(e);
                }
            };
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    warn!(error = %e, "postgres connection closed with error");
                }
            });
            Ok(PgConnection {
                client,
                abandoned: false,
            })
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.abandoned || conn.is_closed()
    }
}
