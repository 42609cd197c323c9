use chrono::{DateTime, Utc};
use error_stack::{Result, ResultExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::payload;
use crate::schema::{AttendanceEvent, Identity, InsertAttendance, DEFAULT_COURSE_ID};
use crate::types::CourseId;
use crate::App;

/// A scan event coming from a badge reader.
#[derive(Debug)]
pub struct CheckIn<'a> {
    /// Scanner output, either a bare external id or a structured record.
    pub payload: &'a str,
    /// Falls back to [`DEFAULT_COURSE_ID`] if not set.
    pub course_id: Option<CourseId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub event: AttendanceEvent,
    pub identity_name: String,
    /// External id of the admitted roster member.
    pub identity_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Admitted(Admission),
    /// The roster member already checked in today. Nothing was written.
    AlreadyPresent,
    /// The scan did not match any roster member.
    NotFound,
}

#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("Could not look up the scanned identity")]
    Lookup,
    /// The event may or may not have been written, callers must
    /// re-check before retrying.
    #[error("Could not write the attendance event")]
    WriteFailed,
}

impl CheckIn<'_> {
    #[tracing::instrument(skip(app), name = "services.check_in")]
    pub async fn perform(self, app: &App) -> Result<ScanOutcome, CheckInError> {
        let key = payload::resolve(self.payload);
        let course_id = self.course_id.unwrap_or(DEFAULT_COURSE_ID);

        let now = app.now();
        let (start, end) = app.timezone.day_bounds(app.timezone.date_of(now));

        // lookups stay off the write transaction
        let identity = {
            let mut conn = app.db_read().await.change_context(CheckInError::Lookup)?;
            let identity = Identity::find_by_scan_key(&mut conn, &key)
                .await
                .change_context(CheckInError::Lookup)?;

            let Some(identity) = identity else {
                info!(%key, "scan did not match any roster member");
                return Ok(ScanOutcome::NotFound);
            };

            let present = AttendanceEvent::exists_within(&mut conn, identity.id, start, end)
                .await
                .change_context(CheckInError::Lookup)?;

            if present {
                debug!(identity.id = %identity.id, "already checked in today");
                return Ok(ScanOutcome::AlreadyPresent);
            }
            identity
        };

        let entry = InsertAttendance {
            identity_id: identity.id,
            course_id,
            checked_in_at: now,
            scanned_payload: self.payload,
        };
        admit(app, identity, &entry, (start, end)).await
    }
}

/// Moves `identity` from unmarked to present for the local day
/// `[start, end)`, unless a concurrent scan got there first.
#[tracing::instrument(skip_all, fields(identity.id = %identity.id, course.id = %entry.course_id))]
async fn admit(
    app: &App,
    identity: Identity,
    entry: &InsertAttendance<'_>,
    (start, end): (DateTime<Utc>, DateTime<Utc>),
) -> Result<ScanOutcome, CheckInError> {
    // the conditional insert is the first statement of the transaction
    let mut tx = app
        .db_write()
        .await
        .change_context(CheckInError::WriteFailed)?;

    let inserted = entry
        .insert_once_within(&mut tx, start, end)
        .await
        .change_context(CheckInError::WriteFailed)?;

    // lost the race against a concurrent scan of the same badge
    let Some(event) = inserted else {
        debug!("already checked in today");
        return Ok(ScanOutcome::AlreadyPresent);
    };

    tx.commit()
        .await
        .change_context(CheckInError::WriteFailed)
        .attach_printable("could not commit attendance event")?;

    info!(event.id = %event.id, "roster member checked in");
    Ok(ScanOutcome::Admitted(Admission {
        event,
        identity_name: identity.display_name(),
        identity_key: identity.external_id,
    }))
}

/// Outbound result of a scan, one per distinguishable outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanReply {
    Admitted {
        identity_name: String,
        identity_key: String,
    },
    AlreadyPresent,
    NotFound,
    /// Storage failed. The event is not guaranteed to be absent.
    WriteFailed,
}

impl ScanReply {
    #[must_use]
    pub fn from_result(result: &Result<ScanOutcome, CheckInError>) -> Self {
        match result {
            Ok(ScanOutcome::Admitted(admission)) => Self::Admitted {
                identity_name: admission.identity_name.clone(),
                identity_key: admission.identity_key.clone(),
            },
            Ok(ScanOutcome::AlreadyPresent) => Self::AlreadyPresent,
            Ok(ScanOutcome::NotFound) => Self::NotFound,
            Err(..) => Self::WriteFailed,
        }
    }
}
