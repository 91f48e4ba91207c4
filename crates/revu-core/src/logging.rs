//! File logging setup.
//!
//! The TUI owns the terminal, so diagnostics go to a daily-rolling file
//! under ${REVU_HOME}/logs. The REVU_LOG environment variable overrides
//! the configured filter.

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::paths;

/// Initializes the global tracing subscriber with a file writer.
///
/// Returns the appender guard; dropping it flushes buffered log lines,
/// so the caller must keep it alive for the process lifetime.
pub fn init(filter: &str) -> Result<WorkerGuard> {
    let dir = paths::logs_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(&dir, "revu.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter =
        EnvFilter::try_from_env("REVU_LOG").unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}
