use chrono::{NaiveDate, NaiveTime};
use error_stack::{Result, ResultExt};
use serde::Serialize;
use thiserror::Error;

use crate::schema::{LedgerOrder, LedgerRow, DEFAULT_COURSE_ID};
use crate::types::{Actor, CourseId};
use crate::App;

/// Maximum number of records a single ledger query returns.
pub const LEDGER_PAGE_LIMIT: u32 = 500;

/// Reads the check-ins of one course for one local day.
///
/// Without a date, today's ledger is returned newest first. With a
/// date, that day is returned in chronological order.
#[derive(Debug, Default)]
pub struct LedgerQuery {
    pub course_id: Option<CourseId>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRecord {
    pub external_id: String,
    pub last_name: String,
    pub first_name: String,
    /// Academic program of the roster member.
    pub course: Option<String>,
    pub level: Option<String>,
    /// Local date of the check-in.
    pub date: NaiveDate,
    /// Local time of the check-in.
    pub time: NaiveTime,
}

#[derive(Debug, Error)]
#[error("Could not read the attendance ledger")]
pub struct LedgerError;

impl LedgerQuery {
    #[tracing::instrument(skip(app, actor), fields(actor = %actor.label()), name = "services.ledger")]
    pub async fn perform(self, app: &App, actor: &Actor) -> Result<Vec<LedgerRecord>, LedgerError> {
        let (date, order) = match self.date {
            Some(date) => (date, LedgerOrder::OldestFirst),
            None => (app.timezone.date_of(app.now()), LedgerOrder::NewestFirst),
        };

        let (start, end) = app.timezone.day_bounds(date);
        let course_id = self.course_id.unwrap_or(DEFAULT_COURSE_ID);

        let mut conn = app.db_read().await.change_context(LedgerError)?;
        let rows = LedgerRow::fetch(&mut conn, course_id, start, end, order, LEDGER_PAGE_LIMIT)
            .await
            .change_context(LedgerError)?;

        let records = rows
            .into_iter()
            .map(|row| LedgerRecord {
                date: app.timezone.date_of(row.checked_in_at),
                time: app.timezone.time_of(row.checked_in_at),
                external_id: row.external_id,
                last_name: row.last_name,
                first_name: row.first_name,
                course: row.program,
                level: row.level,
            })
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_include;
    use serde_json::json;

    use super::*;
    use crate::services::check_in::{CheckIn, ScanOutcome};
    use crate::test_utils::{self, TestApp};

    async fn scan(test: &TestApp, payload: &str) {
        let outcome = CheckIn {
            payload,
            course_id: None,
        }
        .perform(&test.app)
        .await
        .unwrap();
        assert!(matches!(outcome, ScanOutcome::Admitted(..)));
    }

    fn ids(records: &[LedgerRecord]) -> Vec<&str> {
        records.iter().map(|v| v.external_id.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_day_yields_no_records() {
        let test = test_utils::build_test_app().await;
        let records = LedgerQuery {
            date: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..Default::default()
        }
        .perform(&test.app, &Actor::System)
        .await
        .unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn today_is_newest_first_and_past_days_are_chronological() {
        let test = test_utils::build_test_app().await;
        test_utils::seed_identity(&test.app, "S100", "Jane", "Doe").await;
        test_utils::seed_identity(&test.app, "S200", "John", "Roe").await;
        test_utils::seed_identity(&test.app, "S300", "Ann", "Poe").await;

        test.set_local_time(2026, 10, 15, 7, 30);
        scan(&test, "S200").await;
        test.set_local_time(2026, 10, 15, 8, 0);
        scan(&test, "S100").await;
        test.set_local_time(2026, 10, 15, 8, 15);
        scan(&test, "S300").await;

        let today = LedgerQuery::default()
            .perform(&test.app, &Actor::System)
            .await
            .unwrap();
        assert_eq!(ids(&today), ["S300", "S100", "S200"]);

        test.set_local_time(2026, 10, 16, 9, 0);
        scan(&test, "S100").await;

        let history = LedgerQuery {
            date: NaiveDate::from_ymd_opt(2026, 10, 15),
            ..Default::default()
        }
        .perform(&test.app, &Actor::System)
        .await
        .unwrap();
        assert_eq!(ids(&history), ["S200", "S100", "S300"]);

        let today = LedgerQuery::default()
            .perform(&test.app, &Actor::System)
            .await
            .unwrap();
        assert_eq!(ids(&today), ["S100"]);
    }

    #[tokio::test]
    async fn records_use_local_date_and_time() {
        let test = test_utils::build_test_app().await;
        test_utils::seed_identity(&test.app, "S100", "Jane", "Doe").await;

        // still October 15th in UTC
        test.set_local_time(2026, 10, 16, 0, 30);
        scan(&test, "S100").await;

        let records = LedgerQuery::default()
            .perform(&test.app, &Actor::System)
            .await
            .unwrap();

        assert_json_include!(
            actual: serde_json::to_value(&records).unwrap(),
            expected: json!([{
                "external_id": "S100",
                "last_name": "Doe",
                "first_name": "Jane",
                "course": "BSCS",
                "level": "1",
                "date": "2026-10-16",
                "time": "00:30:00",
            }])
        );
    }

    #[tokio::test]
    async fn other_courses_are_not_listed() {
        let test = test_utils::build_test_app().await;
        test_utils::seed_identity(&test.app, "S100", "Jane", "Doe").await;
        scan(&test, "S100").await;

        let records = LedgerQuery {
            course_id: Some(CourseId(2)),
            date: None,
        }
        .perform(&test.app, &Actor::System)
        .await
        .unwrap();

        assert!(records.is_empty());
    }
}
