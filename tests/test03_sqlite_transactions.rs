#![cfg(feature = "sqlite")]

mod common;

use std::time::Duration;

use common::{create_entry, entry_count, small_pool, sqlite_manager};
use sql_query_manager::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn chained_statements_commit_together() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, manager) = sqlite_manager(small_pool()).await?;

    let mut tx = manager
        .begin_transaction(["ledger.create-entry", "ledger.tag-entry"])
        .await?;
    assert!(tx.is_open());
    assert_eq!(tx.remaining(), 1);

    tx.bind([RowValues::Int(1), RowValues::Float(9.99)]);
    let id = tx.execute().await?.ok_or("insert should return an id")?;
    assert!(tx.next_query()?);
    tx.bind([id.clone(), RowValues::from("groceries")]);
    tx.execute().await?;
    assert!(!tx.next_query()?);
    tx.commit().await?;

    assert_eq!(tx.transaction_state(), Some(TransactionState::Committed));
    assert_eq!(entry_count(&manager).await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rollback_after_constraint_violation_discards_earlier_writes()
-> Result<(), Box<dyn std::error::Error>> {
    let (_dir, manager) = sqlite_manager(small_pool()).await?;
    let before = entry_count(&manager).await?;

    let mut tx = manager
        .begin_transaction(["ledger.create-entry", "ledger.tag-entry"])
        .await?;
    tx.bind([RowValues::Int(1), RowValues::Float(5.0)]);
    let id = tx.execute().await?;
    assert!(id.is_some());
    tx.next_query()?;
    // No entry 9999 exists, so the foreign key rejects the tag.
    tx.bind([RowValues::Int(9999), RowValues::from("orphan")]);
    let err = tx.execute().await.unwrap_err();
    assert!(err.is_execution(), "unexpected error: {err}");
    tx.rollback().await?;

    assert_eq!(tx.transaction_state(), Some(TransactionState::RolledBack));
    assert_eq!(entry_count(&manager).await?, before);
    let status = manager.connections().status();
    assert_eq!(status.connections, status.idle_connections);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_commit_rolls_back_and_releases_the_connection()
-> Result<(), Box<dyn std::error::Error>> {
    let (_dir, manager) = sqlite_manager(small_pool()).await?;
    let baseline = manager.connections().status();

    // The notes foreign key is deferred, so the orphan insert only fails at COMMIT.
    let mut tx = manager
        .begin_transaction(["ledger.create-entry", "ledger.note-entry"])
        .await?;
    tx.bind([RowValues::Int(1), RowValues::Float(3.0)]);
    tx.execute().await?;
    tx.next_query()?;
    tx.bind([RowValues::Int(9999), RowValues::from("orphan")]);
    tx.execute().await?;

    let err = tx.commit().await.unwrap_err();
    assert!(err.is_execution(), "unexpected error: {err}");
    assert_eq!(tx.transaction_state(), Some(TransactionState::RolledBack));
    assert!(matches!(tx.commit().await, Err(QueryManagerError::TransactionState(_))));

    assert_eq!(manager.connections().status(), baseline);
    assert_eq!(entry_count(&manager).await?, 0);
    let notes = manager
        .get_one("ledger.count-notes", Vec::<RowValues>::new())
        .await?
        .and_then(|row| row.get("total").and_then(RowValues::as_int).copied());
    assert_eq!(notes, Some(0));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unopenable_database_is_a_connection_error() {
    let started = std::time::Instant::now();
    let result = ConnectionManager::sqlite_builder("/nonexistent/dir/ledger.db")
        .pool(PoolOptions::default().with_acquire_timeout(Duration::from_secs(10)))
        .build()
        .await;
    assert!(matches!(result, Err(QueryManagerError::ConnectionError(_))), "{result:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn finished_transactions_reject_further_work() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, manager) = sqlite_manager(small_pool()).await?;

    let mut tx = manager.begin_transaction("ledger.entry-by-id").await?;
    tx.bind([1_i64]);
    tx.fetch().await?;
    tx.commit().await?;
    assert!(!tx.is_open());

    assert!(matches!(tx.fetch().await, Err(QueryManagerError::TransactionState(_))));
    assert!(matches!(tx.execute().await, Err(QueryManagerError::TransactionState(_))));
    assert!(matches!(tx.count().await, Err(QueryManagerError::TransactionState(_))));
    assert!(matches!(tx.next_query(), Err(QueryManagerError::TransactionState(_))));
    assert!(matches!(tx.commit().await, Err(QueryManagerError::TransactionState(_))));
    assert!(matches!(tx.rollback().await, Err(QueryManagerError::TransactionState(_))));

    // Local edits stay possible.
    tx.bind([2_i64]).interpolate("unused", "x");
    assert_eq!(tx.params(), &[RowValues::Int(2)]);

    let mut rolled_back = manager.begin_transaction("ledger.entry-by-id").await?;
    rolled_back.rollback().await?;
    assert!(matches!(
        rolled_back.commit().await,
        Err(QueryManagerError::TransactionState(msg)) if msg.contains("rolled back")
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn uncommitted_writes_are_invisible_to_other_connections()
-> Result<(), Box<dyn std::error::Error>> {
    let (_dir, manager) = sqlite_manager(small_pool()).await?;
    create_entry(&manager, 1, 1.0).await?;

    let mut tx = manager
        .begin_transaction(["ledger.create-entry", "ledger.count-entries"])
        .await?;
    tx.bind([RowValues::Int(2), RowValues::Float(2.0)]);
    tx.execute().await?;
    tx.next_query()?;
    tx.bind(Vec::<RowValues>::new());
    let inside = tx.fetch().await?;
    assert_eq!(
        inside.first().and_then(|row| row.get("total")).and_then(RowValues::as_int),
        Some(&2)
    );

    // Another pooled connection still sees the committed state only.
    assert_eq!(entry_count(&manager).await?, 1);

    tx.commit().await?;
    assert_eq!(entry_count(&manager).await?, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transaction_helper_commits_on_ok_and_rolls_back_on_err()
-> Result<(), Box<dyn std::error::Error>> {
    let (_dir, manager) = sqlite_manager(small_pool()).await?;

    let id = manager
        .transaction("ledger.create-entry", async |q: &mut Query| {
            q.bind([RowValues::Int(3), RowValues::Float(1.5)]);
            q.execute().await
        })
        .await?;
    assert!(id.is_some());
    assert_eq!(entry_count(&manager).await?, 1);

    let result: Result<(), QueryManagerError> = manager
        .transaction("ledger.create-entry", async |q: &mut Query| {
            q.bind([RowValues::Int(3), RowValues::Float(2.5)]);
            q.execute().await?;
            Err(QueryManagerError::MalformedQuery("abort".into()))
        })
        .await;
    assert!(matches!(result, Err(QueryManagerError::MalformedQuery(_))));
    assert_eq!(entry_count(&manager).await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_an_open_transaction_discards_its_writes()
-> Result<(), Box<dyn std::error::Error>> {
    let (_dir, manager) = sqlite_manager(small_pool()).await?;
    {
        let mut tx = manager.begin_transaction("ledger.create-entry").await?;
        tx.bind([RowValues::Int(4), RowValues::Float(8.0)]);
        tx.execute().await?;
    }
    assert_eq!(entry_count(&manager).await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_pool_times_out_as_resource_unavailable()
-> Result<(), Box<dyn std::error::Error>> {
    let pool = PoolOptions::default()
        .with_max_size(1)
        .with_acquire_timeout(Duration::from_millis(200));
    let (_dir, manager) = sqlite_manager(pool).await?;

    let mut tx = manager.begin_transaction("ledger.count-entries").await?;
    let err = manager
        .get_query("ledger.count-entries")?
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, QueryManagerError::ResourceUnavailable(_)), "unexpected error: {err}");
    assert!(matches!(
        manager.begin_transaction("ledger.count-entries").await,
        Err(QueryManagerError::ResourceUnavailable(_))
    ));

    tx.rollback().await?;
    assert_eq!(entry_count(&manager).await?, 0);
    Ok(())
}
