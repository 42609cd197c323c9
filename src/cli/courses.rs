use clap::Parser;
use error_stack::{Result, ResultExt};
use rollcall::schema::Course;
use rollcall::services::courses::CreateCourse;
use rollcall::types::Actor;

use super::{print_json, run_with_app, CommandError};

#[derive(Debug, Parser)]
pub struct AddCourseCommand {
    #[clap(long)]
    pub code: String,
    #[clap(long)]
    pub name: String,
    #[clap(long)]
    pub instructor: Option<String>,
    #[clap(long)]
    pub time_slot: Option<String>,
}

pub fn add(args: AddCourseCommand) -> Result<(), CommandError> {
    run_with_app(|app| async move {
        let course = CreateCourse {
            code: &args.code,
            name: &args.name,
            instructor: args.instructor.as_deref(),
            time_slot: args.time_slot.as_deref(),
        }
        .perform(&app, &Actor::System)
        .await
        .change_context(CommandError)?;

        print_json(&course)
    })
}

pub fn list() -> Result<(), CommandError> {
    run_with_app(|app| async move {
        let mut conn = app.db_read().await.change_context(CommandError)?;
        let courses = Course::list(&mut conn).await.change_context(CommandError)?;
        print_json(&courses)
    })
}
