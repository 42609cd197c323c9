use serde::{Deserialize, Serialize};
use std::fmt::Display;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Deserialize, Serialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}

row_id!(
    /// Row id of an operator account.
    AccountId
);
row_id!(
    /// Row id of a session/course context.
    CourseId
);
row_id!(
    /// Row id of a recorded attendance event.
    EventId
);
row_id!(
    /// Row id of a roster member. Not to be confused with the
    /// human-assigned external id printed on badges.
    IdentityId
);
