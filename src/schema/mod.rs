mod account;
mod attendance;
mod course;
mod identity;

pub use account::{Account, InsertAccount};
pub use attendance::{AttendanceEvent, InsertAttendance, LedgerOrder, LedgerRow};
pub use course::{Course, InsertCourse, DEFAULT_COURSE_ID};
pub use identity::{Identity, InsertIdentity};
