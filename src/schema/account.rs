use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::database::{Connection, ErrorExt, Result};
use crate::types::AccountId;

/// An operator account allowed to manage the roster.
#[derive(Clone, FromRow, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub created_at: DateTime<Utc>,
    pub email: String,
    /// Argon2 PHC string, or the plaintext secret of an account
    /// that has not logged in since hashing was introduced.
    pub credential: String,
    pub display_name: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("email", &self.email)
            .field("credential", &"<hidden>")
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl Account {
    #[tracing::instrument(skip(conn), name = "db.accounts.find")]
    pub async fn find(conn: &mut Connection, id: AccountId) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Looks up an account by its email, ignoring case. The secret
    /// is never part of the query.
    #[tracing::instrument(skip_all, name = "db.accounts.find_by_email")]
    pub async fn find_by_email(conn: &mut Connection, email: &str) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM accounts WHERE lower(email) = lower(?) ORDER BY id LIMIT 1")
            .bind(email)
            .fetch_optional(conn)
            .await
            .into_db_error()
    }

    /// Replaces the stored credential only if it still equals `current`,
    /// so two logins migrating the same account cannot clobber each
    /// other. Returns whether a row was updated.
    #[tracing::instrument(skip(conn, current, replacement), name = "db.accounts.replace_credential")]
    pub async fn replace_credential(
        conn: &mut Connection,
        id: AccountId,
        current: &str,
        replacement: &str,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET credential = ? WHERE id = ? AND credential = ?")
            .bind(replacement)
            .bind(id)
            .bind(current)
            .execute(conn)
            .await
            .into_db_error()?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct InsertAccount<'a> {
    pub email: &'a str,
    /// Stored as given, callers are expected to hash it first.
    pub credential: &'a str,
    pub display_name: &'a str,
}

impl InsertAccount<'_> {
    /// Fails with [`Error::UniqueViolation`](crate::database::Error::UniqueViolation)
    /// if the email is already taken.
    #[tracing::instrument(skip_all, name = "db.accounts.insert")]
    pub async fn insert(&self, conn: &mut Connection) -> Result<Account> {
        sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (email, credential, display_name)
             VALUES (?, ?, ?)
             RETURNING *",
        )
        .bind(self.email)
        .bind(self.credential)
        .bind(self.display_name)
        .fetch_one(conn)
        .await
        .into_db_error()
    }
}
