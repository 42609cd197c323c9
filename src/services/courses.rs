use error_stack::{Report, Result, ResultExt};
use thiserror::Error;
use tracing::info;

use crate::database::ErrorExt2;
use crate::schema::{Course, InsertCourse};
use crate::types::Actor;
use crate::App;

#[derive(Debug, Default)]
pub struct CreateCourse<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub instructor: Option<&'a str>,
    pub time_slot: Option<&'a str>,
}

#[derive(Debug, Error)]
pub enum CreateCourseError {
    #[error("Course code and name must not be empty")]
    InvalidCourse,
    #[error("A course with this code already exists")]
    DuplicateKey,
    #[error("Could not write the course")]
    WriteFailed,
}

impl CreateCourse<'_> {
    #[tracing::instrument(skip(app, actor), fields(actor = %actor.label()), name = "services.courses.create")]
    pub async fn perform(self, app: &App, actor: &Actor) -> Result<Course, CreateCourseError> {
        let code = self.code.trim();
        let name = self.name.trim();
        if code.is_empty() || name.is_empty() {
            return Err(Report::new(CreateCourseError::InvalidCourse));
        }

        let mut tx = app
            .db_write()
            .await
            .change_context(CreateCourseError::WriteFailed)?;

        let course = InsertCourse {
            code,
            name,
            instructor: self.instructor,
            time_slot: self.time_slot,
        }
        .insert(&mut tx)
        .await
        .map_err(|e| {
            let context = if e.is_unique_violation() {
                CreateCourseError::DuplicateKey
            } else {
                CreateCourseError::WriteFailed
            };
            e.change_context(context)
        })?;

        tx.commit()
            .await
            .change_context(CreateCourseError::WriteFailed)?;

        info!(course.id = %course.id, "added course");
        Ok(course)
    }
}
