use thiserror::Error;

mod database;
mod logging;
mod server;

pub use database::Database;
pub use logging::{Logging, LoggingStyle};
pub use server::{Server, UtcOffset};

#[derive(Debug, Error)]
#[error("Failed to load configuration")]
pub struct ParseError;
