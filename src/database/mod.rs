use error_stack::{Report, ResultExt};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;

use crate::config;

mod error;
pub mod migrations;
#[cfg(test)]
pub mod testing;

pub use error::*;

pub type Transaction<'a> = sqlx::Transaction<'a, sqlx::Sqlite>;
pub type PoolConnection = sqlx::pool::PoolConnection<sqlx::Sqlite>;
pub type Connection = sqlx::SqliteConnection;

/// A SQLite database connection pool.
///
/// The pool is shared by every concurrent check-in and login. Each
/// in-core write runs inside its own [`Transaction`] which commits
/// explicitly and rolls back when dropped.
#[derive(Clone)]
pub struct Pool {
    pool: sqlx::SqlitePool,
}

impl Pool {
    /// Creates and tests a database pool from its configuration.
    pub async fn new(cfg: &config::Database) -> Result<Self> {
        let connect_opts = SqliteConnectOptions::from_str(cfg.url.as_str())
            .change_context(Error::InvalidUrl)?
            .create_if_missing(cfg.create_if_missing)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(cfg.timeout());

        let mut pool_opts = SqlitePoolOptions::new()
            .acquire_timeout(cfg.timeout())
            .max_connections(cfg.pool_size.get());

        if let Some(min_idle) = cfg.min_idle {
            pool_opts = pool_opts.min_connections(min_idle.get());
        }

        let pool = Self {
            pool: pool_opts.connect_lazy_with(connect_opts),
        };

        pool.wait_until_healthy().await?;
        Ok(pool)
    }

    pub(crate) fn from_sqlx(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.pool.fmt(f)
    }
}

impl Pool {
    /// Starts a database transaction. It stays active until it is
    /// committed, or rolled back by dropping it.
    ///
    /// The transaction is deferred, so its first statement should be
    /// a write. If it reads first, SQLite fails the later write with
    /// `SQLITE_BUSY` instead of waiting while another connection is
    /// writing.
    #[tracing::instrument(name = "db.transaction", skip(self))]
    pub async fn begin(&self) -> Result<Transaction<'static>> {
        self.pool.begin().await.into_db_error()
    }

    /// It attempts to get an active database connection.
    #[tracing::instrument(name = "db.connect", skip(self))]
    pub async fn get(&self) -> Result<PoolConnection> {
        self.pool.acquire().await.into_db_error()
    }

    /// Waits until a connection can be established or the configured
    /// timeout elapses.
    #[tracing::instrument(skip(self))]
    pub async fn wait_until_healthy(&self) -> Result<()> {
        match self.pool.acquire().await {
            Ok(..) => Ok(()),
            Err(e @ sqlx::Error::PoolTimedOut) => Err(e).change_context(Error::UnhealthyPool),
            Err(e) => Err(Report::new(e).change_context(Error::Internal)),
        }
    }

    pub(crate) fn as_sqlx(&self) -> &sqlx::SqlitePool {
        &self.pool
    }
}
