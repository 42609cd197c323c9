pub mod app;
pub mod config;
pub mod crypto;
pub mod database;
pub mod logging;
pub mod payload;
pub mod schema;
pub mod services;
pub mod types;
pub mod util;

pub use app::App;

#[cfg(test)]
pub(crate) mod test_utils;
