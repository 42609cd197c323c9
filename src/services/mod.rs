pub mod accounts;
pub mod check_in;
pub mod courses;
pub mod ledger;
pub mod login;
pub mod roster;

use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) fn validate_email(email: &str) -> bool {
    static PATTERN: Lazy<Option<Regex>> =
        Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

    PATTERN.as_ref().map_or(false, |re| re.is_match(email))
}

/// Emails are compared and stored case-insensitively.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
