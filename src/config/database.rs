use serde::Deserialize;
use std::num::{NonZeroU32, NonZeroU64};
use std::time::Duration;

use crate::types::Sensitive;

/// Configuration for connecting to the SQLite attendance database.
#[derive(Debug, Deserialize)]
pub struct Database {
    /// Connection URL of the SQLite database file.
    ///
    /// **Environment variables**:
    /// - `ROLLCALL_DB_URL` or `DATABASE_URL`
    #[serde(default = "Database::default_url")]
    pub url: Sensitive<String>,
    /// Minimum idle database connections kept around by the pool.
    ///
    /// **Environment variables**:
    /// - `ROLLCALL_DB_MIN_IDLE`
    pub min_idle: Option<NonZeroU32>,
    /// Maximum amount of connections the pool can hold.
    ///
    /// **Environment variables**:
    /// - `ROLLCALL_DB_POOL_SIZE`
    #[serde(default = "Database::default_pool_size")]
    pub pool_size: NonZeroU32,
    /// How long this process can wait for a connection to be
    /// acquired or for a locked database to be released.
    ///
    /// **Environment variables**:
    /// - `ROLLCALL_DB_TIMEOUT_SECS`
    #[serde(default = "Database::default_timeout_secs")]
    pub timeout_secs: NonZeroU64,
    /// Creates the database file if it does not exist yet.
    ///
    /// **Environment variables**:
    /// - `ROLLCALL_DB_CREATE_IF_MISSING`
    #[serde(default = "Database::default_create_if_missing")]
    pub create_if_missing: bool,
}

impl Database {
    const DEFAULT_URL: &'static str = "sqlite://attendance.db";
    const DEFAULT_POOL_SIZE: u32 = 5;
    const DEFAULT_TIMEOUT_SECS: u64 = 5;

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.get())
    }

    fn default_url() -> Sensitive<String> {
        Sensitive::new(Self::DEFAULT_URL.to_string())
    }

    // Required by serde
    const fn default_pool_size() -> NonZeroU32 {
        match NonZeroU32::new(Self::DEFAULT_POOL_SIZE) {
            Some(n) => n,
            None => panic!("DEFAULT_POOL_SIZE is accidentally set to 0"),
        }
    }

    const fn default_timeout_secs() -> NonZeroU64 {
        match NonZeroU64::new(Self::DEFAULT_TIMEOUT_SECS) {
            Some(n) => n,
            None => panic!("DEFAULT_TIMEOUT_SECS is accidentally set to 0"),
        }
    }

    const fn default_create_if_missing() -> bool {
        true
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            min_idle: None,
            pool_size: Self::default_pool_size(),
            timeout_secs: Self::default_timeout_secs(),
            create_if_missing: Self::default_create_if_missing(),
        }
    }
}
