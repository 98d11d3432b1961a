//! Structured logging for kerntriage
//!
//! The library only emits `tracing` events. Binaries install a subscriber
//! once through [`init_logging`]:
//!
//! - stderr in `pretty` or `json` format (ANSI only when stderr is a tty)
//! - an optional append-only file in the same format (0600, parent dir 0700)
//!
//! Parsers carry their own span (`kernel_log_parser`, `build_log_parser`)
//! nested under `triage`. Field names used across the crate: `suite`,
//! `family`, `blocks`, `failures`.
//!
//! Snippets are never logged at `info` or above; CI logs can be megabytes.

pub use crate::config::LogFormat;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where and how log events are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level filter (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
    /// Also append events to this file
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to open log file {0}: {1}")]
    FileOpen(PathBuf, io::Error),
}

/// Parse a configured level name; `warning` is accepted for `warn`.
pub fn parse_level(level: &str) -> Result<LevelFilter, LogError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        _ => Err(LogError::InvalidLevel(level.to_string())),
    }
}

/// Install the global subscriber.
///
/// Fails with [`LogError::AlreadyInitialized`] when any global subscriber is
/// already set. An invalid `level` is rejected even when `RUST_LOG` is
/// present, so a bad config never goes unnoticed.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let level = parse_level(&config.level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    let mut layers: Vec<BoxedLayer> = vec![format_layer(
        config.format,
        io::stderr,
        io::stderr().is_terminal(),
    )];
    if let Some(path) = &config.file {
        let file = open_log_file(path).map_err(|e| LogError::FileOpen(path.clone(), e))?;
        layers.push(format_layer(config.format, Arc::new(file), false));
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .map_err(|_| LogError::AlreadyInitialized)?;

    tracing::debug!(
        log_level = %level,
        log_format = %config.format,
        log_file = ?config.file,
        "Logging initialized"
    );
    Ok(())
}

#[must_use]
pub fn is_logging_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_timer(SystemTime)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event(true)
            .boxed(),
    }
}

fn open_log_file(path: &Path) -> io::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let mut dirs = std::fs::DirBuilder::new();
        dirs.recursive(true);
        #[cfg(unix)]
        std::os::unix::fs::DirBuilderExt::mode(&mut dirs, 0o700);
        dirs.create(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
    options.open(path)
}
