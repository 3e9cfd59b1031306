mod common;

use std::fs;

use sql_query_manager::prelude::*;
use sql_query_manager::derive_count_sql;

#[test]
fn loads_every_sql_file_as_a_namespace() -> Result<(), Box<dyn std::error::Error>> {
    let store = TemplateStore::load_dir(common::queries_dir())?;
    assert_eq!(store.namespaces(), vec!["ledger", "reports"]);
    assert_eq!(store.ids("reports"), vec!["totals-by-user"]);
    assert_eq!(
        store.lookup("ledger", "entry-by-id")?,
        "SELECT id, user_id, amount FROM entries WHERE id = $1"
    );
    assert_eq!(
        store.get(&TemplateId::parse("ledger.page-for-user")?)?,
        "SELECT e.id, e.amount\n  FROM entries e\n WHERE e.user_id = $1\n ORDER BY e.{{column}} {{order}}\n LIMIT $2 OFFSET $3;"
    );
    Ok(())
}

#[test]
fn reloading_unchanged_sources_is_identical() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("users.sql"),
        "-- find\nSELECT * FROM users WHERE id = $1\n-- all\nSELECT * FROM users\n",
    )?;
    fs::write(dir.path().join("orders.sql"), "-- recent\nSELECT * FROM orders LIMIT 5\n")?;
    fs::write(dir.path().join("notes.md"), "-- ignored\nnot sql\n")?;

    let first = TemplateStore::load_dir(dir.path())?;
    let second = TemplateStore::load_dir(dir.path())?;
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    for namespace in first.namespaces() {
        for id in first.ids(namespace) {
            assert_eq!(first.lookup(namespace, id)?, second.lookup(namespace, id)?);
        }
    }
    assert!(first.lookup("notes", "ignored").is_err());
    Ok(())
}

#[test]
fn missing_directory_is_a_source_error() {
    let err = TemplateStore::load_dir("/definitely/not/a/query/dir").unwrap_err();
    assert!(matches!(err, QueryManagerError::TemplateSource { .. }));
}

#[test]
fn count_statements_derive_from_fixture_templates() -> Result<(), Box<dyn std::error::Error>> {
    let store = TemplateStore::load_dir(common::queries_dir())?;
    assert_eq!(
        derive_count_sql(store.lookup("ledger", "amounts-for-user")?)?,
        "SELECT COUNT(*) AS total FROM entries WHERE user_id=$1"
    );
    assert_eq!(
        derive_count_sql(store.lookup("ledger", "page-for-user")?)?,
        "SELECT COUNT(*) AS total FROM entries e WHERE e.user_id = $1"
    );
    Ok(())
}
