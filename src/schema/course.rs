use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::{Connection, ErrorExt, Result};
use crate::types::CourseId;

/// Context used when a scan does not name one. Seeded by the
/// initial migration.
pub const DEFAULT_COURSE_ID: CourseId = CourseId(1);

/// A session or course that check-ins are recorded against.
#[derive(Debug, Clone, FromRow, PartialEq, Eq, Serialize)]
pub struct Course {
    pub id: CourseId,
    pub created_at: DateTime<Utc>,
    pub code: String,
    pub name: String,
    pub instructor: Option<String>,
    pub time_slot: Option<String>,
}

impl Course {
    #[tracing::instrument(skip(conn), name = "db.courses.find")]
    pub async fn find(conn: &mut Connection, id: CourseId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM courses WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    #[tracing::instrument(skip(conn), name = "db.courses.list")]
    pub async fn list(conn: &mut Connection) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM courses ORDER BY id")
            .fetch_all(conn)
            .await
            .into_db_error()
    }
}

#[derive(Debug, Default)]
pub struct InsertCourse<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub instructor: Option<&'a str>,
    pub time_slot: Option<&'a str>,
}

impl InsertCourse<'_> {
    #[tracing::instrument(skip_all, name = "db.courses.insert", fields(course.code = %self.code))]
    pub async fn insert(&self, conn: &mut Connection) -> Result<Course> {
        sqlx::query_as::<_, Course>(
            "INSERT INTO courses (code, name, instructor, time_slot)
             VALUES (?, ?, ?, ?)
             RETURNING *",
        )
        .bind(self.code)
        .bind(self.name)
        .bind(self.instructor)
        .bind(self.time_slot)
        .fetch_one(conn)
        .await
        .into_db_error()
    }
}
