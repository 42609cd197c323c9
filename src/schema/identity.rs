use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::{Connection, ErrorExt, Result};
use crate::types::IdentityId;

/// A roster member that can be checked in.
#[derive(Debug, Clone, FromRow, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: IdentityId,
    pub created_at: DateTime<Utc>,
    /// Human-assigned id printed on badges and ID cards.
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub program: Option<String>,
    pub level: Option<String>,
    /// File name of the member's photo.
    pub photo: Option<String>,
    /// Pre-issued token encoded into a QR badge.
    pub qr_token: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Finds the roster member a scan refers to, matching either a
    /// pre-issued QR token or a raw external id. The first match wins.
    #[tracing::instrument(skip(conn), name = "db.identities.find_by_scan_key")]
    pub async fn find_by_scan_key(conn: &mut Connection, key: &str) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM identities WHERE qr_token = ?1 OR external_id = ?1 ORDER BY id LIMIT 1",
        )
        .bind(key)
        .fetch_optional(conn)
        .await
        .into_db_error()
    }

    #[tracing::instrument(skip(conn), name = "db.identities.list")]
    pub async fn list(conn: &mut Connection) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM identities ORDER BY last_name, first_name, id")
            .fetch_all(conn)
            .await
            .into_db_error()
    }

    /// Sets or clears the QR token of the roster member with
    /// `external_id`, returning the updated row if it exists.
    #[tracing::instrument(skip(conn, token), name = "db.identities.set_qr_token")]
    pub async fn set_qr_token(
        conn: &mut Connection,
        external_id: &str,
        token: Option<&str>,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE identities SET qr_token = ? WHERE external_id = ? RETURNING *",
        )
        .bind(token)
        .bind(external_id)
        .fetch_optional(conn)
        .await
        .into_db_error()
    }

    /// Clears the QR token and overwrites the photo column of one
    /// roster member.
    #[tracing::instrument(skip(conn, photo), name = "db.identities.reset_linkage")]
    pub async fn reset_linkage(
        conn: &mut Connection,
        id: IdentityId,
        photo: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE identities SET qr_token = NULL, photo = ? WHERE id = ?")
            .bind(photo)
            .bind(id)
            .execute(conn)
            .await
            .into_db_error()?;

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InsertIdentity<'a> {
    pub external_id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub program: Option<&'a str>,
    pub level: Option<&'a str>,
    pub photo: Option<&'a str>,
    pub qr_token: Option<&'a str>,
}

impl InsertIdentity<'_> {
    /// Fails with [`Error::UniqueViolation`](crate::database::Error::UniqueViolation)
    /// if the external id, email or QR token is already taken.
    #[tracing::instrument(skip_all, name = "db.identities.insert", fields(
        identity.external_id = %self.external_id,
    ))]
    pub async fn insert(&self, conn: &mut Connection) -> Result<Identity> {
        sqlx::query_as::<_, Identity>(
            "INSERT INTO identities
                (external_id, first_name, last_name, email, program, level, photo, qr_token)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(self.external_id)
        .bind(self.first_name)
        .bind(self.last_name)
        .bind(self.email)
        .bind(self.program)
        .bind(self.level)
        .bind(self.photo)
        .bind(self.qr_token)
        .fetch_one(conn)
        .await
        .into_db_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{testing::test_pool, ErrorExt2};

    fn jane() -> InsertIdentity<'static> {
        InsertIdentity {
            external_id: "S100",
            first_name: "Jane",
            last_name: "Doe",
            email: "jane@school.edu",
            program: Some("BSCS"),
            level: Some("2"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn scan_key_matches_external_id_or_qr_token() {
        let pool = test_pool().await;
        let mut conn = pool.get().await.unwrap();

        let jane = jane().insert(&mut conn).await.unwrap();
        assert_eq!(jane.display_name(), "Jane Doe");

        let by_id = Identity::find_by_scan_key(&mut conn, "S100").await.unwrap();
        assert_eq!(by_id.as_ref(), Some(&jane));

        let linked = Identity::set_qr_token(&mut conn, "S100", Some("qr-7f3a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(linked.qr_token.as_deref(), Some("qr-7f3a"));
        assert!(Identity::set_qr_token(&mut conn, "S999", Some("qr-0000"))
            .await
            .unwrap()
            .is_none());

        let by_token = Identity::find_by_scan_key(&mut conn, "qr-7f3a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_token.id, jane.id);

        assert!(Identity::find_by_scan_key(&mut conn, "S999")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn first_match_wins_when_keys_collide() {
        let pool = test_pool().await;
        let mut conn = pool.get().await.unwrap();

        let first = jane().insert(&mut conn).await.unwrap();
        let second = InsertIdentity {
            external_id: "S200",
            first_name: "John",
            last_name: "Roe",
            email: "john@school.edu",
            // a token that looks like someone else's external id
            qr_token: Some("S100"),
            ..Default::default()
        }
        .insert(&mut conn)
        .await
        .unwrap();
        assert_ne!(first.id, second.id);

        let found = Identity::find_by_scan_key(&mut conn, "S100")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn duplicate_external_id_or_email_is_rejected() {
        let pool = test_pool().await;
        let mut conn = pool.get().await.unwrap();
        jane().insert(&mut conn).await.unwrap();

        let same_id = InsertIdentity {
            email: "other@school.edu",
            ..jane()
        };
        assert!(same_id.insert(&mut conn).await.unwrap_err().is_unique_violation());

        let same_email = InsertIdentity {
            external_id: "S101",
            ..jane()
        };
        assert!(same_email
            .insert(&mut conn)
            .await
            .unwrap_err()
            .is_unique_violation());

        assert_eq!(Identity::list(&mut conn).await.unwrap().len(), 1);
    }
}
