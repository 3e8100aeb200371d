use std::{fmt, str::FromStr};

use tracing_subscriber::EnvFilter;
use workmodel_error::{generic_error, ErrorContext as _, GenericError};

/// Validated log filtering directives.
#[derive(Clone, Debug)]
pub struct LogLevel(String);

impl LogLevel {
    /// Builds an `EnvFilter` from the directives.
    pub fn as_env_filter(&self) -> EnvFilter {
        // Directives were validated on construction, so nothing is dropped here.
        EnvFilter::builder().parse_lossy(&self.0)
    }
}

impl FromStr for LogLevel {
    type Err = GenericError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(generic_error!("Log level cannot be empty."));
        }

        EnvFilter::builder()
            .parse(value)
            .map(|_| Self(value.to_string()))
            .error_context("Failed to parse valid log level.")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Initializes the logging subsystem for `tracing`, writing compact, human-readable output to standard output.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error will be returned.
pub fn initialize_logging(level: &LogLevel) -> Result<(), GenericError> {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(level.as_env_filter())
        .with_ansi(true)
        .with_target(true)
        .try_init()
        .map_err(|e| generic_error!("Failed to initialize logging: {}", e))
}
