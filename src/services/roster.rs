use error_stack::{Report, Result, ResultExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::{normalize_email, validate_email};
use crate::database::ErrorExt2;
use crate::schema::{Identity, InsertIdentity};
use crate::types::{Actor, PhotoRef};
use crate::App;

#[derive(Debug, Default)]
pub struct CreateIdentity<'a> {
    pub external_id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub program: Option<&'a str>,
    pub level: Option<&'a str>,
    /// File name of the photo, if any.
    pub photo: Option<&'a str>,
    pub qr_token: Option<&'a str>,
}

#[derive(Debug, Error)]
pub enum CreateIdentityError {
    #[error("External id must not be empty")]
    InvalidExternalId,
    #[error("First and last name must not be empty")]
    InvalidName,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Invalid photo reference")]
    InvalidPhoto,
    #[error("External id, email or QR token is already taken")]
    DuplicateKey,
    #[error("Could not write the roster entry")]
    WriteFailed,
}

impl CreateIdentity<'_> {
    #[tracing::instrument(skip(app, actor), fields(actor = %actor.label()), name = "services.roster.create")]
    pub async fn perform(self, app: &App, actor: &Actor) -> Result<Identity, CreateIdentityError> {
        let external_id = self.external_id.trim();
        if external_id.is_empty() {
            return Err(Report::new(CreateIdentityError::InvalidExternalId));
        }

        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(Report::new(CreateIdentityError::InvalidName));
        }

        let email = normalize_email(self.email);
        if !validate_email(&email) {
            return Err(Report::new(CreateIdentityError::InvalidEmail));
        }

        let photo = self
            .photo
            .map(PhotoRef::parse)
            .transpose()
            .map_err(|e| Report::new(e).change_context(CreateIdentityError::InvalidPhoto))?;

        let qr_token = self.qr_token.map(str::trim).filter(|v| !v.is_empty());

        let mut tx = app
            .db_write()
            .await
            .change_context(CreateIdentityError::WriteFailed)?;

        let identity = InsertIdentity {
            external_id,
            first_name,
            last_name,
            email: &email,
            program: self.program,
            level: self.level,
            photo: photo.map(PhotoRef::file_name),
            qr_token,
        }
        .insert(&mut tx)
        .await
        .map_err(|e| {
            let context = if e.is_unique_violation() {
                CreateIdentityError::DuplicateKey
            } else {
                CreateIdentityError::WriteFailed
            };
            e.change_context(context)
        })?;

        tx.commit()
            .await
            .change_context(CreateIdentityError::WriteFailed)?;

        info!(identity.id = %identity.id, "added roster member");
        Ok(identity)
    }
}

/// Links a QR token to a roster member, or unlinks it with `None`.
#[derive(Debug)]
pub struct LinkQrToken<'a> {
    pub external_id: &'a str,
    pub token: Option<&'a str>,
}

#[derive(Debug, Error)]
pub enum LinkQrTokenError {
    #[error("No roster member with this external id")]
    NotFound,
    #[error("QR token is already linked to another roster member")]
    DuplicateKey,
    #[error("Could not update the roster entry")]
    WriteFailed,
}

impl LinkQrToken<'_> {
    #[tracing::instrument(skip(app, actor), fields(actor = %actor.label()), name = "services.roster.link_qr_token")]
    pub async fn perform(self, app: &App, actor: &Actor) -> Result<Identity, LinkQrTokenError> {
        let token = self.token.map(str::trim).filter(|v| !v.is_empty());
        let mut tx = app
            .db_write()
            .await
            .change_context(LinkQrTokenError::WriteFailed)?;

        let identity = Identity::set_qr_token(&mut tx, self.external_id.trim(), token)
            .await
            .map_err(|e| {
                let context = if e.is_unique_violation() {
                    LinkQrTokenError::DuplicateKey
                } else {
                    LinkQrTokenError::WriteFailed
                };
                e.change_context(context)
            })?
            .ok_or_else(|| Report::new(LinkQrTokenError::NotFound))?;

        tx.commit()
            .await
            .change_context(LinkQrTokenError::WriteFailed)?;

        Ok(identity)
    }
}

/// Clears every QR linkage token and strips photo columns down to
/// plain file names. Anything [`PhotoRef::parse`] rejects is dropped.
#[derive(Debug)]
pub struct CleanupRoster;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub identities: usize,
    pub qr_tokens_cleared: usize,
    pub photos_kept: usize,
    pub photos_dropped: usize,
}

#[derive(Debug, Error)]
#[error("Could not clean up the roster")]
pub struct CleanupError;

impl CleanupRoster {
    #[tracing::instrument(skip_all, fields(actor = %actor.label()), name = "services.roster.cleanup")]
    pub async fn perform(self, app: &App, actor: &Actor) -> Result<CleanupSummary, CleanupError> {
        let identities = {
            let mut conn = app.db_read().await.change_context(CleanupError)?;
            Identity::list(&mut conn).await.change_context(CleanupError)?
        };

        let mut summary = CleanupSummary {
            identities: identities.len(),
            ..Default::default()
        };

        // every statement in here is a write
        let mut tx = app.db_write().await.change_context(CleanupError)?;
        for identity in &identities {
            if identity.qr_token.is_some() {
                summary.qr_tokens_cleared += 1;
            }

            let photo = match identity.photo.as_deref().map(PhotoRef::parse) {
                None => None,
                Some(Ok(photo)) => {
                    summary.photos_kept += 1;
                    Some(photo.file_name())
                }
                Some(Err(reason)) => {
                    debug!(identity.id = %identity.id, %reason, "dropping photo reference");
                    summary.photos_dropped += 1;
                    None
                }
            };

            Identity::reset_linkage(&mut tx, identity.id, photo)
                .await
                .change_context(CleanupError)
                .attach_printable_lazy(|| format!("identity id: {}", identity.id))?;
        }

        tx.commit().await.change_context(CleanupError)?;

        info!(?summary, "roster cleanup complete");
        Ok(summary)
    }
}
