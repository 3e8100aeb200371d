use std::path::PathBuf;

use clap::Parser;

use crate::logging::LogLevel;

/// Default name of the work model parameters file.
pub const DEFAULT_PARAMETERS_FILE: &str = "WorkModelParameters.json";

#[derive(Clone, Debug, Parser)]
#[command(about)]
pub struct Cli {
    /// Path to the work model parameters file.
    ///
    /// Unless overridden by the parameters themselves, the service graph is read from, and the work model written to,
    /// the directory containing this file.
    #[arg(short = 'c', long = "config-file", default_value = DEFAULT_PARAMETERS_FILE)]
    pub parameters_file: PathBuf,

    /// Log filtering directives, such as `info` or `workmodel_core=debug`.
    #[arg(short = 'l', long, env = "WORKMODEL_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Seed for the random source.
    ///
    /// Two runs with the same seed, parameters and service graph produce the same work model. When not set, a fresh seed
    /// is drawn for every run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fail instead of writing a work model when a service could not be assigned an internal service.
    #[arg(long)]
    pub deny_unassigned: bool,
}
