use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Logging {
    /// **Environment variable**: `ROLLCALL_LOGGING_STYLE`
    ///
    /// There are four styles to choose:
    /// - `compact` - compacts logs but it is readable enough
    /// - `full` - default formatter from [`tracing_subscriber`].
    /// - `pretty` - makes logs pretty
    /// - `json` - serializes logs into JSON data
    ///
    /// The default value is `compact`, if not set.
    #[serde(default)]
    pub style: LoggingStyle,

    /// **Environment variable**: `ROLLCALL_LOGGING_TARGETS`
    ///
    /// Filters logging events with the use of directives. If it is
    /// blank, `RUST_LOG` is used instead.
    ///
    /// You may refer on how directives work and parse and its examples by going to:
    /// https://docs.rs/tracing-subscriber/0.3.18/tracing_subscriber/filter/struct.EnvFilter.html
    #[serde(default)]
    pub targets: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingStyle {
    #[default]
    Compact,
    Full,
    Pretty,
    Json,
}
