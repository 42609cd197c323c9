use serde::Serialize;

use super::AccountId;
use crate::schema::Account;

/// An authenticated operator, produced by a successful login and
/// handed explicitly to every administrative operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorSession {
    pub account_id: AccountId,
    pub display_name: String,
    pub email: String,
}

impl From<&Account> for OperatorSession {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            display_name: account.display_name.clone(),
            email: account.email.clone(),
        }
    }
}

/// Who is performing an administrative operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Local maintenance from the command line, trusted by virtue
    /// of having access to the database file.
    System,
    Operator(OperatorSession),
}

impl Actor {
    /// Label recorded in tracing spans.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::System => "system".to_string(),
            Self::Operator(session) => format!("operator:{}", session.account_id),
        }
    }
}
