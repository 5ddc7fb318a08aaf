//! Database module for SQLite persistence

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

use crate::anchors::SqliteAnchorStore;
use crate::error::Result;

/// Create a new database connection pool and initialize the schema
///
/// In-memory databases are private to a connection, so they get a pool of
/// exactly one connection.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");

    let mut options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    if !in_memory {
        options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .connect_with(options)
        .await?;

    SqliteAnchorStore::new(pool.clone()).init().await?;

    Ok(pool)
}
