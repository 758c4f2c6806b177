//! Tracing initialization utilities.

use std::{fmt as std_fmt, str::FromStr};
use tracing_subscriber::{fmt, prelude::*, util::TryInitError, EnvFilter};

/// Output format of the installed subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

/// Error for a log format name that is neither `text` nor `json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLogFormat(pub String);

impl std_fmt::Display for UnknownLogFormat {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        write!(f, "unknown log format: {:?}", self.0)
    }
}

impl std::error::Error for UnknownLogFormat {}

/// Initialize tracing with the given default filter, writing text to stderr.
///
/// The filter can be overridden by the `RUST_LOG` environment variable.
/// Panics if a global subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// use pipeline_defaults::init_tracing;
///
/// // Debug for this crate (CORS fallbacks, version negotiation), info elsewhere
/// init_tracing("pipeline_defaults=debug,info");
/// ```
pub fn init_tracing(default_filter: &str) {
    init_tracing_with(default_filter, LogFormat::Text)
}

/// Like [`init_tracing`], choosing the output format.
pub fn init_tracing_with(default_filter: &str, format: LogFormat) {
    if let Err(e) = try_init_tracing(default_filter, format) {
        panic!("failed to initialize tracing: {e}");
    }
}

/// Install the subscriber, failing if one is already set.
///
/// # Filter Syntax
///
/// The filter follows the `tracing_subscriber::EnvFilter` syntax:
/// - `info` - Enable info level for all targets
/// - `my_crate=debug,info` - Debug for `my_crate`, info for everything else
pub fn try_init_tracing(default_filter: &str, format: LogFormat) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
    }
}
