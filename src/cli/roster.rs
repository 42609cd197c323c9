use clap::Parser;
use error_stack::{Result, ResultExt};
use rollcall::schema::Identity;
use rollcall::services::roster::{CleanupRoster, CreateIdentity, LinkQrToken};
use rollcall::types::Actor;

use super::{print_json, run_with_app, CommandError};

#[derive(Debug, Parser)]
pub struct AddIdentityCommand {
    #[clap(long)]
    pub external_id: String,
    #[clap(long)]
    pub first_name: String,
    #[clap(long)]
    pub last_name: String,
    #[clap(long)]
    pub email: String,
    #[clap(long)]
    pub program: Option<String>,
    #[clap(long)]
    pub level: Option<String>,
    /// File name of the member's photo
    #[clap(long)]
    pub photo: Option<String>,
    #[clap(long)]
    pub qr_token: Option<String>,
}

pub fn add(args: AddIdentityCommand) -> Result<(), CommandError> {
    run_with_app(|app| async move {
        let identity = CreateIdentity {
            external_id: &args.external_id,
            first_name: &args.first_name,
            last_name: &args.last_name,
            email: &args.email,
            program: args.program.as_deref(),
            level: args.level.as_deref(),
            photo: args.photo.as_deref(),
            qr_token: args.qr_token.as_deref(),
        }
        .perform(&app, &Actor::System)
        .await
        .change_context(CommandError)?;

        print_json(&identity)
    })
}

#[derive(Debug, Parser)]
pub struct LinkQrCommand {
    pub external_id: String,
    /// Token to link, the current one is unlinked if not set
    #[clap(long)]
    pub token: Option<String>,
}

pub fn link_qr(args: LinkQrCommand) -> Result<(), CommandError> {
    run_with_app(|app| async move {
        let identity = LinkQrToken {
            external_id: &args.external_id,
            token: args.token.as_deref(),
        }
        .perform(&app, &Actor::System)
        .await
        .change_context(CommandError)?;

        print_json(&identity)
    })
}

pub fn list() -> Result<(), CommandError> {
    run_with_app(|app| async move {
        let mut conn = app.db_read().await.change_context(CommandError)?;
        let identities = Identity::list(&mut conn)
            .await
            .change_context(CommandError)?;

        print_json(&identities)
    })
}

pub fn cleanup() -> Result<(), CommandError> {
    run_with_app(|app| async move {
        let summary = CleanupRoster
            .perform(&app, &Actor::System)
            .await
            .change_context(CommandError)?;

        print_json(&summary)
    })
}
