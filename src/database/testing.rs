use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::num::NonZeroU32;
use std::str::FromStr;
use tempfile::TempDir;

use super::{migrations, Pool};
use crate::config;
use crate::types::Sensitive;

/// Creates a private in-memory database with every migration
/// applied.
///
/// The pool holds exactly one connection that never expires since
/// an in-memory SQLite database lives and dies with its connection.
pub async fn test_pool() -> Pool {
    let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("invalid in-memory database url")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(connect_opts)
        .await
        .expect("failed to connect to the test database");

    let pool = Pool::from_sqlx(pool);
    migrations::run_pending(&pool)
        .await
        .expect("failed to apply migrations");

    pool
}

/// Creates a database file inside `dir`, opened the same way as in
/// production: WAL journaling and a pool of several connections that
/// contend for the write lock.
pub async fn file_pool(dir: &TempDir, connections: u32) -> Pool {
    let path = dir.path().join("attendance.db");
    let cfg = config::Database {
        url: Sensitive::new(format!("sqlite://{}", path.display())),
        pool_size: NonZeroU32::new(connections).expect("pool needs a connection"),
        ..Default::default()
    };

    let pool = Pool::new(&cfg)
        .await
        .expect("failed to open the test database file");

    migrations::run_pending(&pool)
        .await
        .expect("failed to apply migrations");

    pool
}
