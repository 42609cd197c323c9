use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::{self, UtcOffset};
use crate::database::testing::{file_pool, test_pool};
use crate::database::Pool;
use crate::schema::{Account, Identity, InsertAccount, InsertIdentity};
use crate::types::ManualClock;
use crate::App;

/// Offset of the venue every test app runs in. Picked so that a
/// local morning is still the previous day in UTC.
pub const VENUE_OFFSET_SECS: i32 = 8 * 3600;

pub struct TestApp {
    pub app: App,
    pub clock: Arc<ManualClock>,
    // keeps the database file of a shared test app alive
    _dir: Option<TempDir>,
}

impl TestApp {
    pub fn set_local_time(&self, year: i32, month: u32, day: u32, hour: u32, minute: u32) {
        self.clock.set(local(year, month, day, hour, minute));
    }
}

pub fn venue_offset() -> FixedOffset {
    FixedOffset::east_opt(VENUE_OFFSET_SECS).unwrap()
}

/// Converts a venue-local wall clock time into UTC.
pub fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    venue_offset()
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub async fn build_test_app() -> TestApp {
    crate::logging::init_for_tests();
    assemble(test_pool().await, None)
}

/// Like [`build_test_app`] but backed by a temporary database file
/// with `connections` pooled connections, so requests really run in
/// parallel against SQLite.
pub async fn build_shared_test_app(connections: u32) -> TestApp {
    crate::logging::init_for_tests();

    let dir = tempfile::tempdir().unwrap();
    let pool = file_pool(&dir, connections).await;
    assemble(pool, Some(dir))
}

fn assemble(pool: Pool, dir: Option<TempDir>) -> TestApp {
    let config = config::Server {
        utc_offset: Some(UtcOffset(venue_offset())),
        ..Default::default()
    };

    let clock = Arc::new(ManualClock::new(local(2026, 10, 15, 9, 0)));
    let app = App::from_parts(config, pool, clock.clone());
    TestApp {
        app,
        clock,
        _dir: dir,
    }
}

pub async fn seed_identity(app: &App, external_id: &str, first_name: &str, last_name: &str) -> Identity {
    let email = format!("{}@school.edu", external_id.to_lowercase());
    InsertIdentity {
        external_id,
        first_name,
        last_name,
        email: &email,
        program: Some("BSCS"),
        level: Some("1"),
        ..Default::default()
    }
    .insert(&mut app.db_read().await.unwrap())
    .await
    .unwrap()
}

/// Inserts an account whose secret is stored in plaintext, the way
/// accounts were kept before hashing was introduced.
pub async fn seed_legacy_account(app: &App, email: &str, plaintext: &str) -> Account {
    InsertAccount {
        email,
        credential: plaintext,
        display_name: "Legacy Admin",
    }
    .insert(&mut app.db_read().await.unwrap())
    .await
    .unwrap()
}
