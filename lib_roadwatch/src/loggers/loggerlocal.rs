//! # Local Logging Setup
//!
//! Every executable in the workspace logs the same way: a coloured console
//! layer for operators and a JSON layer written to a daily rolling file for
//! post-mortem analysis, both filtered by one `EnvFilter`.

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// # Logger Local Options
///
/// Where and how log lines are emitted.
#[derive(Debug, Clone)]
pub struct LoggerLocalOptions {
    /// Base name of the rolling log files (`<app_name>.YYYY-MM-DD`).
    pub app_name: String,
    /// Default filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// Directory for the rolling files.
    pub log_dir: PathBuf,
    /// Emit ANSI colours on the console layer.
    pub use_ansi: bool,
}

impl LoggerLocalOptions {
    /// Options read from `RUST_LOG` (default `info`) and `LOG_DIR` (default `logs`).
    pub fn from_env(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_dir: PathBuf::from(env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string())),
            use_ansi: true,
        }
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the non-blocking file writer when dropped, so the
/// caller must keep it alive for the whole process (bind it in `main`).
pub fn setup_logging(options: &LoggerLocalOptions) -> Result<WorkerGuard, LoggingError> {
    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&options.log_dir).map_err(|source| LoggingError::LogDir {
        path: options.log_dir.clone(),
        source,
    })?;

    let file_appender = rolling::daily(&options.log_dir, &options.app_name);
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_ansi(options.use_ansi);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_appender)
        .json();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&options.log_level).map_err(|source| LoggingError::Filter {
            filter: options.log_level.clone(),
            source,
        })?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;

    info!(
        log_level = %options.log_level,
        log_dir = %options.log_dir.display(),
        "Logging initialized"
    );
    Ok(guard)
}

