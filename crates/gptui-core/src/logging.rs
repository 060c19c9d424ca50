//! File-based tracing setup.
//!
//! The terminal belongs to the UI, so logs go to `<GPTUI_HOME>/logs/gptui.log`.
//! Filtering follows `GPTUI_LOG` (e.g. `GPTUI_LOG=gptui_core=debug`), default `warn`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "GPTUI_LOG";

const LOG_FILE_NAME: &str = "gptui.log";

/// Installs the global subscriber writing to `dir`.
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;

    Ok(guard)
}
