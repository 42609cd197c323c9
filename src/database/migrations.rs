use error_stack::ResultExt;
use sqlx::migrate::Migrator;
use tokio::time::Instant;
use tracing::info;

use super::{Error, Pool, Result};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[tracing::instrument(skip_all, name = "migrations.run_pending")]
pub async fn run_pending(pool: &Pool) -> Result<()> {
    let now = Instant::now();
    info!("Performing database migrations...");

    MIGRATOR
        .run(pool.as_sqlx())
        .await
        .change_context(Error::Migration)?;

    let elapsed = now.elapsed();
    info!("Successfully performed database migrations! took {elapsed:.2?}");
    Ok(())
}
