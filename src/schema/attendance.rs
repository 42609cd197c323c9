use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::{Connection, ErrorExt, Result};
use crate::types::{CourseId, EventId, IdentityId};

/// One admitted check-in. Rows are only ever appended.
#[derive(Debug, Clone, FromRow, PartialEq, Eq, Serialize)]
pub struct AttendanceEvent {
    pub id: EventId,
    pub identity_id: IdentityId,
    pub course_id: CourseId,
    /// Server-side time the event was written.
    pub checked_in_at: DateTime<Utc>,
    /// Scanner output exactly as received.
    pub scanned_payload: String,
}

impl AttendanceEvent {
    /// Whether the identity already has an event in `[start, end)`,
    /// regardless of course.
    #[tracing::instrument(skip(conn), name = "db.attendance.exists_within")]
    pub async fn exists_within(
        conn: &mut Connection,
        identity_id: IdentityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM attendance
                WHERE identity_id = ? AND checked_in_at >= ? AND checked_in_at < ?
            )",
        )
        .bind(identity_id)
        .bind(start)
        .bind(end)
        .fetch_one(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip(conn), name = "db.attendance.list_for_identity")]
    pub async fn list_for_identity(
        conn: &mut Connection,
        identity_id: IdentityId,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM attendance WHERE identity_id = ? ORDER BY checked_in_at, id",
        )
        .bind(identity_id)
        .fetch_all(conn)
        .await
        .into_db_error()
    }
}

#[derive(Debug)]
pub struct InsertAttendance<'a> {
    pub identity_id: IdentityId,
    pub course_id: CourseId,
    pub checked_in_at: DateTime<Utc>,
    pub scanned_payload: &'a str,
}

impl InsertAttendance<'_> {
    /// Appends the event unless the identity already has one in
    /// `[start, end)`, returning `None` in that case.
    ///
    /// The existence check and the insert are a single statement, so
    /// SQLite never lets two of them admit the same identity twice.
    #[tracing::instrument(skip_all, name = "db.attendance.insert_once_within", fields(
        identity.id = %self.identity_id,
        course.id = %self.course_id,
    ))]
    pub async fn insert_once_within(
        &self,
        conn: &mut Connection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<AttendanceEvent>> {
        sqlx::query_as::<_, AttendanceEvent>(
            "INSERT INTO attendance (identity_id, course_id, checked_in_at, scanned_payload)
             SELECT ?1, ?2, ?3, ?4
             WHERE NOT EXISTS (
                SELECT 1 FROM attendance
                WHERE identity_id = ?1 AND checked_in_at >= ?5 AND checked_in_at < ?6
             )
             RETURNING *",
        )
        .bind(self.identity_id)
        .bind(self.course_id)
        .bind(self.checked_in_at)
        .bind(self.scanned_payload)
        .bind(start)
        .bind(end)
        .fetch_optional(conn)
        .await
        .into_db_error()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOrder {
    NewestFirst,
    OldestFirst,
}

/// An attendance event joined with the roster data shown in the
/// ledger.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct LedgerRow {
    pub external_id: String,
    pub last_name: String,
    pub first_name: String,
    pub program: Option<String>,
    pub level: Option<String>,
    pub checked_in_at: DateTime<Utc>,
}

impl LedgerRow {
    #[tracing::instrument(skip(conn), name = "db.attendance.ledger")]
    pub async fn fetch(
        conn: &mut Connection,
        course_id: CourseId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        order: LedgerOrder,
        limit: u32,
    ) -> Result<Vec<Self>> {
        let sql = match order {
            LedgerOrder::NewestFirst => {
                "SELECT i.external_id, i.last_name, i.first_name, i.program, i.level, a.checked_in_at
                 FROM attendance a
                 JOIN identities i ON i.id = a.identity_id
                 WHERE a.course_id = ? AND a.checked_in_at >= ? AND a.checked_in_at < ?
                 ORDER BY a.checked_in_at DESC, a.id DESC
                 LIMIT ?"
            }
            LedgerOrder::OldestFirst => {
                "SELECT i.external_id, i.last_name, i.first_name, i.program, i.level, a.checked_in_at
                 FROM attendance a
                 JOIN identities i ON i.id = a.identity_id
                 WHERE a.course_id = ? AND a.checked_in_at >= ? AND a.checked_in_at < ?
                 ORDER BY a.checked_in_at ASC, a.id ASC
                 LIMIT ?"
            }
        };

        sqlx::query_as::<_, Self>(sql)
            .bind(course_id)
            .bind(start)
            .bind(end)
            .bind(i64::from(limit))
            .fetch_all(conn)
            .await
            .into_db_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::test_pool;
    use crate::schema::{InsertIdentity, DEFAULT_COURSE_ID};
    use chrono::TimeZone;

    #[tokio::test]
    async fn insert_once_within_refuses_second_event() {
        let pool = test_pool().await;
        let mut conn = pool.get().await.unwrap();

        let identity = InsertIdentity {
            external_id: "S100",
            first_name: "Jane",
            last_name: "Doe",
            email: "jane@school.edu",
            ..Default::default()
        }
        .insert(&mut conn)
        .await
        .unwrap();

        let start = Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        let insert = |at| InsertAttendance {
            identity_id: identity.id,
            course_id: DEFAULT_COURSE_ID,
            checked_in_at: at,
            scanned_payload: "S100",
        };

        let first = insert(Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap())
            .insert_once_within(&mut conn, start, end)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = insert(Utc.with_ymd_and_hms(2026, 10, 15, 9, 5, 0).unwrap())
            .insert_once_within(&mut conn, start, end)
            .await
            .unwrap();
        assert!(second.is_none());

        assert!(AttendanceEvent::exists_within(&mut conn, identity.id, start, end)
            .await
            .unwrap());
        assert!(!AttendanceEvent::exists_within(
            &mut conn,
            identity.id,
            end,
            Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap()
        )
        .await
        .unwrap());

        let events = AttendanceEvent::list_for_identity(&mut conn, identity.id)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(Some(&events[0]), first.as_ref());
    }
}
