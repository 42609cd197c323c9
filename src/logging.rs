use error_stack::{Result, ResultExt};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::{Logging, LoggingStyle};

#[derive(Debug, Error)]
#[error("Failed to initialize tracing")]
pub struct TracingInitError;

pub fn init(config: &Logging) -> Result<(), TracingInitError> {
    let filter = make_env_filter(&config.targets);
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let console: Box<dyn Layer<Registry> + Send + Sync> = match config.style {
        LoggingStyle::Compact => console.compact().with_filter(filter).boxed(),
        LoggingStyle::Full => console.with_filter(filter).boxed(),
        LoggingStyle::Pretty => console.pretty().with_filter(filter).boxed(),
        LoggingStyle::Json => console.json().with_filter(filter).boxed(),
    };

    let registry = Registry::default()
        .with(console)
        .with(ErrorLayer::default());

    tracing::subscriber::set_global_default(registry)
        .change_context(TracingInitError)
        .attach_printable("already initialized tracing")
}

/// Installs a subscriber that writes through the test harness. Safe
/// to call from every test, only the first call takes effect.
pub fn init_for_tests() {
    let targets = std::env::var("RUST_LOG").unwrap_or_default();
    let _result = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(make_env_filter(&targets))
        .try_init();
}

fn make_env_filter(targets: &str) -> EnvFilter {
    let default_level = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let targets = if targets.trim().is_empty() {
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default()
    } else {
        targets.to_string()
    };

    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse_lossy(targets)
}
