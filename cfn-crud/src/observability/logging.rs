//! Subscriber setup: a console layer at the selected level and a debug-level
//! file layer.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::RunConfig;
use crate::errors::CrudError;

/// Directives for the file layer: everything from this crate, quieter SDK
/// internals.
const FILE_FILTER: &str = "debug,aws_smithy_runtime=info,aws_config=info,hyper=info,rustls=info";

/// Console verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Progress messages.
    #[default]
    Info,
    /// Everything, including request payloads.
    Debug,
}

impl LogLevel {
    /// Picks the level from CLI flags. `--verbose` is the default.
    #[must_use]
    pub const fn from_flags(debug: bool) -> Self {
        if debug {
            Self::Debug
        } else {
            Self::Info
        }
    }

    /// The matching level filter.
    #[must_use]
    pub const fn as_filter(self) -> LevelFilter {
        match self {
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

/// Builds the console filter: `RUST_LOG` when set, else the selected level.
#[must_use]
pub fn console_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Installs the global subscriber.
///
/// Console output goes to stderr (JSON when configured); the log file
/// always records at debug level and is appended to.
pub fn init_logging(level: LogLevel, config: &RunConfig) -> Result<(), CrudError> {
    let file = open_log_file(&config.log_file)?;

    let console = if config.json_logs {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter(level))
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter(level))
            .boxed()
    };

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .with_filter(EnvFilter::new(FILE_FILTER))
        .boxed();

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| CrudError::Config(format!("cannot install log subscriber: {e}")))?;

    tracing::debug!(level = %level, log_file = %config.log_file.display(), "Logging initialized");
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File, CrudError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
