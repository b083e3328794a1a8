use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::constants::{DEFAULT_LOG_FILTER, LOG_FILE_NAME};

/// Install the global tracing subscriber: JSON lines to a daily-rolled file
/// under `log_dir`, compact text to stderr. Stdout is left for reports.
///
/// Hold the returned [`WorkerGuard`] for the life of the process; dropping it
/// flushes and closes the file writer.
pub fn init_tracing(logging: &LoggingConfig) -> Result<WorkerGuard> {
    let log_dir = prepare_log_dir(logging)?;
    let env_filter = build_filter(logging)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, log_file_name(logging));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .json(),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(guard)
}

/// `RUST_LOG` wins when set and parseable, then `logging.filter`, then
/// [`DEFAULT_LOG_FILTER`]. A malformed `logging.filter` is an error.
pub fn build_filter(logging: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    match logging.filter.as_deref().map(str::trim) {
        Some(directives) if !directives.is_empty() => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid logging.filter {directives:?}")),
        _ => Ok(EnvFilter::new(DEFAULT_LOG_FILTER)),
    }
}

/// Create `log_dir` (and parents) if missing.
fn prepare_log_dir(logging: &LoggingConfig) -> Result<PathBuf> {
    let dir = PathBuf::from(&logging.log_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log dir {}", dir.display()))?;
    Ok(dir)
}

fn log_file_name(logging: &LoggingConfig) -> &str {
    logging
        .file_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(LOG_FILE_NAME)
}
