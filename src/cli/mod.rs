use clap::Parser;
use error_stack::{Result, ResultExt};
use rollcall::types::Sensitive;
use rollcall::{config, logging, App};
use serde::Serialize;
use std::future::Future;
use std::io::Write;
use thiserror::Error;

mod accounts;
mod attendance;
mod courses;
mod roster;

/// Command line options for rollcall.
#[derive(Debug, Parser)]
#[command(
    about = "Attendance check-in and roster maintenance for rollcall",
    version,
    author,
    long_about
)]
pub struct Cli {
    #[clap(subcommand)]
    pub subcommand: Subcommand,
}

impl Cli {
    pub fn run(self) -> Result<(), CommandError> {
        match self.subcommand {
            Subcommand::Migrate => run_with_app(|_app| async { Ok(()) }),
            Subcommand::Scan(args) => self::attendance::scan(args),
            Subcommand::Ledger(args) => self::attendance::ledger(args),
            Subcommand::Login(args) => self::accounts::login(args),
            Subcommand::AddAccount(args) => self::accounts::add(args),
            Subcommand::AddIdentity(args) => self::roster::add(args),
            Subcommand::LinkQr(args) => self::roster::link_qr(args),
            Subcommand::Roster => self::roster::list(),
            Subcommand::Cleanup => self::roster::cleanup(),
            Subcommand::AddCourse(args) => self::courses::add(args),
            Subcommand::Courses => self::courses::list(),
        }
    }
}

#[derive(Debug, Parser)]
pub enum Subcommand {
    /// Applies pending database migrations
    Migrate,
    /// Checks in the roster member a scanned payload refers to
    Scan(self::attendance::ScanCommand),
    /// Prints the attendance ledger of one day
    Ledger(self::attendance::LedgerCommand),
    /// Verifies operator credentials
    Login(self::accounts::LoginCommand),
    /// Creates an operator account
    AddAccount(self::accounts::AddAccountCommand),
    /// Adds a member to the roster
    AddIdentity(self::roster::AddIdentityCommand),
    /// Links or unlinks the QR token of a roster member
    LinkQr(self::roster::LinkQrCommand),
    /// Lists every roster member
    Roster,
    /// Clears QR tokens and strips photo columns down to file names
    Cleanup,
    /// Adds a course that check-ins can be recorded against
    AddCourse(self::courses::AddCourseCommand),
    /// Lists every course
    Courses,
}

#[derive(Debug, Error)]
#[error("Command failed")]
pub struct CommandError;

/// Loads the configuration, installs logging and runs `task` on a
/// fresh runtime with a migrated [`App`].
fn run_with_app<F, Fut, T>(task: F) -> Result<T, CommandError>
where
    F: FnOnce(App) -> Fut,
    Fut: Future<Output = Result<T, CommandError>>,
{
    let config = config::Server::load().change_context(CommandError)?;
    logging::init(&config.logging).change_context(CommandError)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .change_context(CommandError)
        .attach_printable("could not build tokio runtime")?
        .block_on(async move {
            let app = App::new(config).await.change_context(CommandError)?;
            task(app).await
        })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let json = serde_json::to_string_pretty(value).change_context(CommandError)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").change_context(CommandError)
}

/// Takes the password from `ROLLCALL_PASSWORD` if it was set,
/// otherwise reads one line from standard input.
fn read_password(from_env: Option<String>) -> Result<Sensitive<String>, CommandError> {
    if let Some(password) = from_env {
        return Ok(Sensitive::new(password));
    }

    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .change_context(CommandError)
        .attach_printable("could not read password from stdin")?;

    Ok(Sensitive::new(
        line.trim_end_matches(['\r', '\n']).to_string(),
    ))
}
