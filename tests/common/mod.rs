#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use sql_query_manager::prelude::*;
use tempfile::TempDir;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    amount REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS entry_tags (
    entry_id INTEGER NOT NULL REFERENCES entries(id),
    tag TEXT NOT NULL,
    UNIQUE (entry_id, tag)
);
CREATE TABLE IF NOT EXISTS entry_notes (
    entry_id INTEGER NOT NULL REFERENCES entries(id) DEFERRABLE INITIALLY DEFERRED,
    note TEXT NOT NULL
);
";

pub fn queries_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("queries")
}

/// A manager over a fresh database file; keep the `TempDir` alive for the test's duration.
pub async fn sqlite_manager(
    pool: PoolOptions,
) -> Result<(TempDir, QueryManager), QueryManagerError> {
    let dir = tempfile::tempdir().map_err(|e| QueryManagerError::ConfigError(e.to_string()))?;
    let path = dir.path().join("ledger.db");
    let connections = ConnectionManager::sqlite_builder(path.to_string_lossy())
        .pool(pool)
        .build()
        .await?;
    connections.acquire().await?.batch_execute(SCHEMA).await?;
    let manager = QueryManager::from_dir(queries_dir(), connections)?;
    Ok((dir, manager))
}

pub fn small_pool() -> PoolOptions {
    PoolOptions::default()
        .with_max_size(2)
        .with_acquire_timeout(Duration::from_secs(5))
}

pub async fn create_entry(
    manager: &QueryManager,
    user_id: i64,
    amount: f64,
) -> Result<i64, QueryManagerError> {
    let id = manager
        .get_query("ledger.create-entry")?
        .bind([RowValues::Int(user_id), RowValues::Float(amount)])
        .execute()
        .await?;
    id.as_ref()
        .and_then(RowValues::as_int)
        .copied()
        .ok_or_else(|| QueryManagerError::MalformedQuery("insert returned no id".into()))
}

pub async fn entry_count(manager: &QueryManager) -> Result<i64, QueryManagerError> {
    let row = manager
        .get_one("ledger.count-entries", Vec::<RowValues>::new())
        .await?;
    Ok(row
        .and_then(|row| row.get("total").and_then(RowValues::as_int).copied())
        .unwrap_or(-1))
}
