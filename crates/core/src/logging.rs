//! Logging setup
//!
//! Two outputs: a coloured console log and a plain-text file log, each with
//! its own level. `RUST_LOG` overrides the console level.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{Error, Result};

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Console filter, e.g. `info` or `dismob_core=debug`
    pub console_level: String,
    /// File filter
    pub file_level: String,
    /// Log file, `None` disables the file output
    pub file_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: "info".to_string(),
            file_level: "info".to_string(),
            file_path: Some(PathBuf::from("bot.log")),
        }
    }
}

impl LogConfig {
    /// Console output only
    #[must_use]
    pub fn console_only(level: impl Into<String>) -> Self {
        Self {
            console_level: level.into(),
            file_level: "off".to_string(),
            file_path: None,
        }
    }
}

fn filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| Error::Configuration(format!("invalid log filter '{directives}': {e}")))
}

fn split_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file = path
        .file_name()
        .map_or_else(|| PathBuf::from("bot.log"), PathBuf::from);
    (dir, file)
}

/// Install the global subscriber
///
/// The returned guard flushes the file log when dropped; keep it alive for
/// the lifetime of the process.
///
/// # Errors
///
/// Returns an error if a filter is invalid, the log directory cannot be
/// created or a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(env) => env,
        Err(_) => filter(&config.console_level)?,
    };
    let console_layer = fmt::layer().with_target(true).with_filter(console_filter);

    let (file_layer, guard) = match &config.file_path {
        Some(path) => {
            let (dir, file) = split_path(path);
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::never(dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter(&config.file_level)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Initialization(e.to_string()))?;

    Ok(guard)
}
