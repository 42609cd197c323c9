use error_stack::{Report, Result, ResultExt};
use thiserror::Error;
use tokio::task::spawn_blocking;
use tracing::info;

use super::{normalize_email, validate_email};
use crate::crypto;
use crate::database::ErrorExt2;
use crate::schema::{Account, InsertAccount};
use crate::types::{Actor, Sensitive};
use crate::App;

/// Creates an operator account. The secret is always stored hashed.
#[derive(Debug)]
pub struct CreateAccount<'a> {
    pub email: &'a str,
    pub password: Sensitive<&'a str>,
    pub display_name: &'a str,
}

#[derive(Debug, Error)]
pub enum CreateAccountError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Display name must not be empty")]
    InvalidDisplayName,
    #[error("Password must not be empty")]
    EmptyPassword,
    #[error("An account with this email already exists")]
    DuplicateKey,
    #[error("Could not write the account")]
    WriteFailed,
}

impl CreateAccount<'_> {
    #[tracing::instrument(skip(app, actor), fields(actor = %actor.label()), name = "services.accounts.create")]
    pub async fn perform(self, app: &App, actor: &Actor) -> Result<Account, CreateAccountError> {
        let email = normalize_email(self.email);
        if !validate_email(&email) {
            return Err(Report::new(CreateAccountError::InvalidEmail));
        }

        let display_name = self.display_name.trim();
        if display_name.is_empty() {
            return Err(Report::new(CreateAccountError::InvalidDisplayName));
        }

        if self.password.as_str().is_empty() {
            return Err(Report::new(CreateAccountError::EmptyPassword));
        }

        let password = self.password.to_owned_string();
        let credential = spawn_blocking(move || crypto::hash(password.as_str()))
            .await
            .change_context(CreateAccountError::WriteFailed)?
            .change_context(CreateAccountError::WriteFailed)?;

        // the unique index on email decides duplicates
        let mut tx = app
            .db_write()
            .await
            .change_context(CreateAccountError::WriteFailed)?;

        let account = InsertAccount {
            email: &email,
            credential: &credential,
            display_name,
        }
        .insert(&mut tx)
        .await
        .map_err(|e| {
            let context = if e.is_unique_violation() {
                CreateAccountError::DuplicateKey
            } else {
                CreateAccountError::WriteFailed
            };
            e.change_context(context)
        })?;

        tx.commit()
            .await
            .change_context(CreateAccountError::WriteFailed)?;

        info!(account.id = %account.id, "created operator account");
        Ok(account)
    }
}
