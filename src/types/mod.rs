mod actor;
mod id;
mod photo;
mod sensitive;
mod time;

pub use actor::{Actor, OperatorSession};
pub use id::{AccountId, CourseId, EventId, IdentityId};
pub use photo::{PhotoRef, PhotoRefError};
pub use sensitive::Sensitive;
pub use time::{Clock, SystemClock, Timezone};

#[cfg(test)]
pub use time::ManualClock;
