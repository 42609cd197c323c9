use chrono::NaiveDate;
use clap::Parser;
use error_stack::{Result, ResultExt};
use rollcall::services::check_in::{CheckIn, ScanReply};
use rollcall::services::ledger::LedgerQuery;
use rollcall::types::{Actor, CourseId};

use super::{print_json, run_with_app, CommandError};

#[derive(Debug, Parser)]
pub struct ScanCommand {
    /// Scanner output, a bare external id or a structured record
    pub payload: String,
    /// Course id to record the check-in against
    #[clap(long)]
    pub course: Option<i64>,
}

pub fn scan(args: ScanCommand) -> Result<(), CommandError> {
    run_with_app(|app| async move {
        let result = CheckIn {
            payload: &args.payload,
            course_id: args.course.map(CourseId),
        }
        .perform(&app)
        .await;

        print_json(&ScanReply::from_result(&result))?;
        result.map(|_| ()).change_context(CommandError)
    })
}

#[derive(Debug, Parser)]
pub struct LedgerCommand {
    /// Course id whose check-ins are listed
    #[clap(long)]
    pub course: Option<i64>,
    /// Local calendar day (YYYY-MM-DD), defaults to today
    #[clap(long)]
    pub date: Option<NaiveDate>,
}

pub fn ledger(args: LedgerCommand) -> Result<(), CommandError> {
    run_with_app(|app| async move {
        let records = LedgerQuery {
            course_id: args.course.map(CourseId),
            date: args.date,
        }
        .perform(&app, &Actor::System)
        .await
        .change_context(CommandError)?;

        print_json(&records)
    })
}
