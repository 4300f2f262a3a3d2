// ABOUTME: parses the command line of the sidefx executor.
// ABOUTME: selects the input stream, logging setup and RunCommand exit-code policy.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::actions::ExitCodePolicy;

#[derive(Debug, Parser)]
#[command(
    name = "sidefx",
    version,
    about = "Perform scripted file, process and network side effects for monitoring tests."
)]
pub struct Args {
    /// Read the action script from this file instead of stdin.
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Log level. Falls back to SIDEFX_LOG, then info.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Append log lines to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Whether a RunCommand exiting unsuccessfully aborts the run.
    #[arg(long, value_enum, default_value_t = ExitCodePolicy::Strict)]
    pub exit_code_policy: ExitCodePolicy,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One json object per line.
    #[default]
    Json,
    Text,
}
