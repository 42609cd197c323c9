use clap::Parser;
use error_stack::{Result, ResultExt};
use rollcall::services::accounts::CreateAccount;
use rollcall::services::login::{Login, LoginReply};
use rollcall::types::{Actor, OperatorSession, Sensitive};

use super::{print_json, read_password, run_with_app, CommandError};

#[derive(Debug, Parser)]
pub struct LoginCommand {
    #[clap(long)]
    pub email: String,
    /// Read from standard input if not set
    #[clap(long, env = "ROLLCALL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

pub fn login(args: LoginCommand) -> Result<(), CommandError> {
    let password = read_password(args.password)?;
    run_with_app(|app| async move {
        let outcome = Login {
            email: &args.email,
            password: Sensitive::new(password.as_str()),
        }
        .perform(&app)
        .await
        .change_context(CommandError)?;

        print_json(&LoginReply::from(outcome))
    })
}

#[derive(Debug, Parser)]
pub struct AddAccountCommand {
    #[clap(long)]
    pub email: String,
    #[clap(long)]
    pub name: String,
    /// Read from standard input if not set
    #[clap(long, env = "ROLLCALL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

pub fn add(args: AddAccountCommand) -> Result<(), CommandError> {
    let password = read_password(args.password)?;
    run_with_app(|app| async move {
        let account = CreateAccount {
            email: &args.email,
            password: Sensitive::new(password.as_str()),
            display_name: &args.name,
        }
        .perform(&app, &Actor::System)
        .await
        .change_context(CommandError)?;

        print_json(&OperatorSession::from(&account))
    })
}
