// ABOUTME: builds the tracing subscriber that receives one event per executed action.
// ABOUTME: the subscriber is returned as a handle instead of being installed globally.

//! Priority for determining the log filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `SIDEFX_LOG` environment variable (any `EnvFilter` directive)
//! 3. default to `info`

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::cli::{LogFormat, LogLevel};

pub const LOG_ENV: &str = "SIDEFX_LOG";

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

/// Owns the subscriber handle and, for file output, the writer thread guard.
/// Dropping the logger (or calling `shutdown`) flushes pending lines.
pub struct Logger {
    dispatch: Dispatch,
    _guard: Option<WorkerGuard>,
}

impl Logger {
    pub fn init(config: &LogConfig) -> anyhow::Result<Logger> {
        let filter = build_filter(config.level)?;

        let (writer, guard) = match &config.file {
            Some(path) => {
                let (dir, name) = split_log_path(path)?;
                let appender = RollingFileAppender::builder()
                    .rotation(Rotation::NEVER)
                    .filename_prefix(name)
                    .build(&dir)
                    .with_context(|| format!("open log file in {}", dir.display()))?;
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                (BoxMakeWriter::new(non_blocking), Some(guard))
            }
            None => (BoxMakeWriter::new(std::io::stderr), None),
        };

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(writer)
                .boxed(),
            LogFormat::Text => fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        };

        let subscriber = tracing_subscriber::registry().with(layer.with_filter(filter));

        Ok(Logger {
            dispatch: Dispatch::new(subscriber),
            _guard: guard,
        })
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

fn build_filter(level: Option<LogLevel>) -> anyhow::Result<EnvFilter> {
    if let Some(level) = level {
        return Ok(EnvFilter::new(level.as_str()));
    }
    match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(directives.trim()).with_context(|| format!("invalid {LOG_ENV} value {directives:?}"))
        }
        _ => Ok(EnvFilter::new("info")),
    }
}

fn split_log_path(path: &Path) -> anyhow::Result<(PathBuf, String)> {
    let name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_file_output_has_flat_fields() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("events.jsonl");

        let logger = Logger::init(&LogConfig {
            level: Some(LogLevel::Info),
            format: LogFormat::Json,
            file: Some(log_path.clone()),
        })
        .unwrap();

        tracing::dispatcher::with_default(logger.dispatch(), || {
            tracing::info!(action = "DeleteFile", path = "/tmp/x", "DeleteFile");
            tracing::debug!("filtered out");
        });
        logger.shutdown();

        let text = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);

        let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(event["level"], "INFO");
        assert_eq!(event["message"], "DeleteFile");
        assert_eq!(event["action"], "DeleteFile");
        assert_eq!(event["path"], "/tmp/x");
    }

    #[test]
    fn explicit_level_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("text.log");

        let logger = Logger::init(&LogConfig {
            level: Some(LogLevel::Error),
            format: LogFormat::Text,
            file: Some(log_path.clone()),
        })
        .unwrap();

        tracing::dispatcher::with_default(logger.dispatch(), || {
            tracing::info!("quiet");
            tracing::error!(kind = "decode", "fatal");
        });
        logger.shutdown();

        let text = std::fs::read_to_string(&log_path).unwrap();
        assert!(!text.contains("quiet"));
        assert!(text.contains("fatal"));
        assert!(text.contains("kind=\"decode\""));
    }

    #[test]
    fn log_path_without_directory_uses_cwd() {
        let (dir, name) = split_log_path(Path::new("run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "run.log");
        assert!(split_log_path(Path::new("/")).is_err());
    }
}
