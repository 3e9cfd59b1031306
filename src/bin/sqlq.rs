//! Inspect and run query templates from the command line.
//!
//! ```bash
//! sqlq --dir queries list
//! sqlq --dir queries show transactions.list-by-user
//! sqlq --dir queries count-sql transactions.list-by-user
//! sqlq --dir queries fetch users.find-by-id --param 1 --sqlite-path app.db
//! RUST_LOG=debug sqlq --dir queries fetch users.find-by-id --param 1 --db-type postgres
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sql_query_manager::count::derive_count_sql;
use sql_query_manager::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sqlq", about = "Inspect and run SQL query templates")]
struct Cli {
    /// Directory holding the `*.sql` template files
    #[arg(long, default_value = "queries")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every `namespace.id`
    List,
    /// Print a template's SQL
    Show { id: String },
    /// Print the COUNT statement derived from a template
    CountSql { id: String },
    /// Run a template and print its rows as JSON
    Fetch {
        id: String,

        /// Positional parameter, repeat for `$1`, `$2`, …
        #[arg(long = "param")]
        params: Vec<String>,

        #[arg(long, value_enum, default_value = "sqlite")]
        db_type: DatabaseType,

        /// `SQLite` database file
        #[arg(long, default_value = "sqlq.db")]
        sqlite_path: String,
    },
}

/// Read a command-line value as the narrowest `RowValues` it parses as.
fn parse_param(raw: &str) -> RowValues {
    if let Ok(int) = raw.parse::<i64>() {
        return RowValues::Int(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return RowValues::Float(float);
    }
    match raw {
        "true" => RowValues::Bool(true),
        "false" => RowValues::Bool(false),
        "null" => RowValues::Null,
        _ => RowValues::Text(raw.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let store = TemplateStore::load_dir(&cli.dir)?;
    info!(dir = %cli.dir.display(), templates = store.len(), "templates loaded");

    match cli.command {
        Command::List => {
            for namespace in store.namespaces() {
                for id in store.ids(namespace) {
                    println!("{namespace}.{id}");
                }
            }
        }
        Command::Show { id } => {
            println!("{}", store.get(&TemplateId::parse(&id)?)?);
        }
        Command::CountSql { id } => {
            println!("{}", derive_count_sql(store.get(&TemplateId::parse(&id)?)?)?);
        }
        Command::Fetch {
            id,
            params,
            db_type,
            sqlite_path,
        } => {
            let connections = match db_type {
                DatabaseType::Postgres => {
                    ConnectionManager::new_postgres(PostgresOptions::from_env()?).await?
                }
                DatabaseType::Sqlite => {
                    ConnectionManager::sqlite_builder(sqlite_path).build().await?
                }
            };
            let manager = QueryManager::new(store, connections);
            let rows = manager
                .get_query(id.as_str())?
                .bind(params.iter().map(|raw| parse_param(raw)))
                .fetch()
                .await?;
            println!("{}", serde_json::to_string_pretty(&rows.to_json())?);
        }
    }
    Ok(())
}
