use chrono::{DateTime, SubsecRound, Utc};
use error_stack::{Result, ResultExt};
use std::sync::Arc;
use thiserror::Error;

use crate::config;
use crate::database::{self, migrations};
use crate::types::{Clock, SystemClock, Timezone};

/// Shared state handed to every operation: configuration, the
/// database pool, the server clock and the venue time zone.
#[derive(Clone)]
pub struct App {
    pub config: Arc<config::Server>,
    pub db: database::Pool,
    pub clock: Arc<dyn Clock>,
    pub timezone: Timezone,
}

#[derive(Debug, Error)]
#[error("Failed to initialize App struct")]
pub struct AppError;

impl App {
    #[tracing::instrument(skip_all)]
    pub async fn new(cfg: config::Server) -> Result<Self, AppError> {
        let db = database::Pool::new(&cfg.db)
            .await
            .change_context(AppError)
            .attach_printable("could not connect to the database")?;

        migrations::run_pending(&db)
            .await
            .change_context(AppError)?;

        Ok(Self::from_parts(cfg, db, Arc::new(SystemClock)))
    }

    #[must_use]
    pub fn from_parts(cfg: config::Server, db: database::Pool, clock: Arc<dyn Clock>) -> Self {
        let timezone = cfg.timezone();
        Self {
            config: Arc::new(cfg),
            db,
            clock,
            timezone,
        }
    }
}

impl App {
    /// Current server time, truncated to whole seconds so stored
    /// timestamps compare consistently.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(0)
    }

    #[tracing::instrument(skip_all)]
    pub async fn db_read(&self) -> Result<database::PoolConnection, database::Error> {
        self.db.get().await
    }

    /// Starts a scoped transaction. Dropping it without committing
    /// rolls every write back.
    #[tracing::instrument(skip_all)]
    pub async fn db_write(&self) -> Result<database::Transaction<'static>, database::Error> {
        self.db.begin().await
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("db", &self.db)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}
