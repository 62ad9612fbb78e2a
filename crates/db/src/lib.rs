pub mod migrate;
pub mod repo;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Create a SQLite connection pool with WAL mode enabled.
///
/// `":memory:"` gives a private in-memory database held by a single
/// long-lived connection, which is what the test suites use.
pub async fn connect(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = db_path == ":memory:";
    if !in_memory {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let opts = SqliteConnectOptions::from_str(db_path)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    // Every in-memory connection is its own database.
    let pool_opts = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_opts.connect_with(opts).await?;

    Ok(pool)
}
