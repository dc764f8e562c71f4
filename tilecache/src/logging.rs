//! Tracing subscriber setup.
//!
//! Console output goes to stderr with local RFC 3339 timestamps. When a log
//! directory is configured, a daily-rolling file receives the same events
//! through a non-blocking writer; keep the returned guard alive so buffered
//! lines are flushed on exit.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "tilecache=info,tower_http=info,warn";

/// Log file name prefix inside the log directory.
pub const LOG_FILE_PREFIX: &str = "tilecache.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter {0:?}: {1}")]
    Filter(String, String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Logging options.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Filter directives; `RUST_LOG` or [`DEFAULT_FILTER`] when `None`.
    pub filter: Option<String>,
    /// Directory for daily-rolling log files.
    pub directory: Option<PathBuf>,
}

impl LogConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        match &self.filter {
            Some(directives) => EnvFilter::try_new(directives)
                .map_err(|e| LoggingError::Filter(directives.clone(), e.to_string())),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
        }
    }
}

/// Install the global subscriber.
///
/// Returns the file writer guard when file logging is enabled.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = config.env_filter()?;

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(true);

    let (file, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_timer(LocalTime::rfc_3339())
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guard)
}
