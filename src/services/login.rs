use error_stack::{Result, ResultExt};
use serde::Serialize;
use thiserror::Error;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use super::normalize_email;
use crate::crypto::{self, StoredCredential, Verdict};
use crate::schema::Account;
use crate::types::{AccountId, OperatorSession, Sensitive};
use crate::App;

#[derive(Debug)]
pub struct Login<'a> {
    pub email: &'a str,
    pub password: Sensitive<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(OperatorSession),
    /// Either the email is unknown or the secret does not match.
    /// Callers are not told which.
    InvalidCredentials,
}

/// Outbound result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginReply {
    Authenticated {
        account_id: AccountId,
        display_name: String,
        email: String,
    },
    InvalidCredentials,
}

impl From<LoginOutcome> for LoginReply {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated(session) => Self::Authenticated {
                account_id: session.account_id,
                display_name: session.display_name,
                email: session.email,
            },
            LoginOutcome::InvalidCredentials => Self::InvalidCredentials,
        }
    }
}

#[derive(Debug, Error)]
#[error("Could not verify operator credentials")]
pub struct LoginError;

#[derive(Debug, Error)]
#[error("Could not migrate a plaintext credential")]
pub struct CredentialMigrationFailed;

impl Login<'_> {
    #[tracing::instrument(skip(app), name = "services.login")]
    pub async fn perform(self, app: &App) -> Result<LoginOutcome, LoginError> {
        let email = normalize_email(self.email);
        let account = {
            let mut conn = app.db_read().await.change_context(LoginError)?;
            Account::find_by_email(&mut conn, &email)
                .await
                .change_context(LoginError)?
        };

        let presented = self.password.to_owned_string();
        let Some(account) = account else {
            spawn_blocking(move || crypto::dummy_verify(presented.as_str().as_bytes()))
                .await
                .change_context(LoginError)?;

            debug!("no account with this email");
            return Ok(LoginOutcome::InvalidCredentials);
        };

        let stored = account.credential.clone();
        let verdict = spawn_blocking(move || {
            StoredCredential::classify(&stored).verify(presented.as_str().as_bytes())
        })
        .await
        .change_context(LoginError)
        .attach_printable_lazy(|| format!("account id: {}", account.id))?;

        if !verdict.is_match() {
            info!(account.id = %account.id, "rejected login with a wrong secret");
            return Ok(LoginOutcome::InvalidCredentials);
        }

        if verdict == Verdict::MatchedPlaintext {
            let presented = self.password.to_owned_string();
            match migrate_credential(app, &account, presented).await {
                Ok(true) => info!(account.id = %account.id, "migrated plaintext credential"),
                Ok(false) => debug!("credential was already migrated by another login"),
                Err(error) => warn!(?error, "{error}"),
            }
        }

        info!(account.id = %account.id, "operator logged in");
        Ok(LoginOutcome::Authenticated(OperatorSession::from(&account)))
    }
}

/// Replaces the plaintext secret of `account` with its hash. Returns
/// `false` if the stored value changed in the meantime.
#[tracing::instrument(skip_all, fields(account.id = %account.id))]
async fn migrate_credential(
    app: &App,
    account: &Account,
    presented: Sensitive<String>,
) -> Result<bool, CredentialMigrationFailed> {
    let hashed = spawn_blocking(move || crypto::hash(presented.as_str()))
        .await
        .change_context(CredentialMigrationFailed)?
        .change_context(CredentialMigrationFailed)?;

    let mut tx = app
        .db_write()
        .await
        .change_context(CredentialMigrationFailed)?;

    let replaced = Account::replace_credential(&mut tx, account.id, &account.credential, &hashed)
        .await
        .change_context(CredentialMigrationFailed)?;

    tx.commit()
        .await
        .change_context(CredentialMigrationFailed)?;

    Ok(replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::InsertAccount;
    use crate::test_utils::{self, TestApp};
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    async fn login(test: &TestApp, email: &str, password: &str) -> LoginOutcome {
        Login {
            email,
            password: Sensitive::new(password),
        }
        .perform(&test.app)
        .await
        .unwrap()
    }

    async fn stored_credential(test: &TestApp, id: AccountId) -> String {
        let mut conn = test.app.db_read().await.unwrap();
        Account::find(&mut conn, id).await.unwrap().unwrap().credential
    }

    #[tokio::test]
    async fn legacy_login_migrates_to_a_hash() {
        let test = test_utils::build_test_app().await;
        let account = test_utils::seed_legacy_account(&test.app, "admin@school.edu", "admin123").await;

        let LoginOutcome::Authenticated(session) = login(&test, "admin@school.edu", "admin123").await
        else {
            panic!("expected legacy login to succeed");
        };
        assert_eq!(session.account_id, account.id);
        assert_eq!(session.display_name, "Legacy Admin");

        let migrated = stored_credential(&test, account.id).await;
        assert!(migrated.starts_with("$argon2id$"));
        assert_eq!(
            StoredCredential::classify(&migrated).verify(b"admin123"),
            Verdict::Matched
        );

        // the hashed branch takes over and nothing is rewritten again
        assert!(matches!(
            login(&test, "admin@school.edu", "admin123").await,
            LoginOutcome::Authenticated(..)
        ));
        assert_eq!(stored_credential(&test, account.id).await, migrated);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_without_migrating() {
        let test = test_utils::build_test_app().await;
        let account = test_utils::seed_legacy_account(&test.app, "admin@school.edu", "admin123").await;

        assert_eq!(
            login(&test, "admin@school.edu", "admin1234").await,
            LoginOutcome::InvalidCredentials
        );
        assert_eq!(
            login(&test, "admin@school.edu", "").await,
            LoginOutcome::InvalidCredentials
        );
        assert_eq!(stored_credential(&test, account.id).await, "admin123");
    }

    #[tokio::test]
    async fn unknown_email_is_rejected() {
        let test = test_utils::build_test_app().await;
        test_utils::seed_legacy_account(&test.app, "admin@school.edu", "admin123").await;

        assert_eq!(
            login(&test, "nobody@school.edu", "admin123").await,
            LoginOutcome::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn hashed_account_logs_in_ignoring_email_case() {
        let test = test_utils::build_test_app().await;
        let hashed = crypto::hash("s3cret").unwrap();
        let account = InsertAccount {
            email: "ops@school.edu",
            credential: &hashed,
            display_name: "Ops",
        }
        .insert(&mut test.app.db_read().await.unwrap())
        .await
        .unwrap();

        let outcome = login(&test, "  OPS@School.edu ", "s3cret").await;
        assert_eq!(
            outcome,
            LoginOutcome::Authenticated(OperatorSession::from(&account))
        );
        assert_eq!(
            login(&test, "ops@school.edu", "S3CRET").await,
            LoginOutcome::InvalidCredentials
        );
        assert_eq!(stored_credential(&test, account.id).await, hashed);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_secret_reply_identically() {
        let test = test_utils::build_test_app().await;
        let account = test_utils::seed_legacy_account(&test.app, "admin@school.edu", "admin123").await;

        let unknown = LoginReply::from(login(&test, "nobody@school.edu", "admin123").await);
        let wrong = LoginReply::from(login(&test, "admin@school.edu", "nope").await);
        assert_eq!(unknown, wrong);
        assert_json_eq!(
            serde_json::to_value(&wrong).unwrap(),
            json!({ "status": "invalid_credentials" })
        );

        let ok = LoginReply::from(login(&test, "admin@school.edu", "admin123").await);
        assert_json_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({
                "status": "authenticated",
                "account_id": account.id.0,
                "display_name": "Legacy Admin",
                "email": "admin@school.edu",
            })
        );
    }

    #[tokio::test]
    async fn dollar_prefixed_plaintext_logs_in_and_migrates() {
        let test = test_utils::build_test_app().await;
        let account = test_utils::seed_legacy_account(&test.app, "admin@school.edu", "$ecret").await;

        assert_eq!(
            login(&test, "admin@school.edu", "secret").await,
            LoginOutcome::InvalidCredentials
        );
        assert_eq!(stored_credential(&test, account.id).await, "$ecret");

        assert!(matches!(
            login(&test, "admin@school.edu", "$ecret").await,
            LoginOutcome::Authenticated(..)
        ));

        let migrated = stored_credential(&test, account.id).await;
        assert!(migrated.starts_with("$argon2id$"));
        assert_eq!(
            StoredCredential::classify(&migrated).verify(b"$ecret"),
            Verdict::Matched
        );
    }

    #[tokio::test]
    async fn unusable_stored_hash_rejects_instead_of_failing() {
        const UNUSABLE_HASH: &str =
            "$argon2id$v=99$m=19456,t=2,p=1$c29tZXNhbHRzYWx0$aGFzaGhhc2hoYXNoaGFzaGhhc2hoYXNoaGFzaA";

        let test = test_utils::build_test_app().await;
        let account =
            test_utils::seed_legacy_account(&test.app, "admin@school.edu", UNUSABLE_HASH).await;

        let outcome = Login {
            email: "admin@school.edu",
            password: Sensitive::new("s3cret"),
        }
        .perform(&test.app)
        .await;
        assert!(matches!(outcome, Ok(LoginOutcome::InvalidCredentials)));
        assert_eq!(stored_credential(&test, account.id).await, UNUSABLE_HASH);
    }
}
