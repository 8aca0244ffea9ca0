//! Structured logging configuration.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the output format (`pretty` or `json`).
pub const LOG_FORMAT_ENV: &str = "BULKPORT_LOG_FORMAT";

/// Environment variable naming a log file to append to.
pub const LOG_FILE_ENV: &str = "BULKPORT_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything but `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional file to append to instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds the configuration from `RUST_LOG`, `BULKPORT_LOG_FORMAT` and
    /// `BULKPORT_LOG_FILE`.
    ///
    /// Without `RUST_LOG` the level is `info`, or `debug` when `verbose`.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        let default_level = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        let format = std::env::var(LOG_FORMAT_ENV)
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        let file = std::env::var(LOG_FILE_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            format,
            filter,
            file,
        }
    }
}
