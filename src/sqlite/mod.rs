// SQLite backend
//
// - config: options builder and `ConnectionManager` construction
// - manager: bb8 connection manager; connections live behind a mutex and run on the
//   blocking thread pool
// - params: conversion from `RowValues` to rusqlite values
// - query: result extraction and building
// - executor: statement execution

pub mod config;
pub mod executor;
pub mod manager;
pub mod params;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use executor::{execute_batch, execute_query};
pub use manager::{SharedSqliteConnection, SqliteManager};
pub use params::Params;
pub use query::build_result_set;
