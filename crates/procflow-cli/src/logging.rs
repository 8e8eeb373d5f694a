use anyhow::{Context, Result};
use procflow_core::config::LoggingConfig;
use procflow_infrastructure::ProcflowPaths;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "procflow.log";

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
///
/// With `logging.file` set, events go to a daily-rolling file under the logs
/// directory instead of stderr. Keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if !config.file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    }

    let logs_dir = ProcflowPaths::default()
        .logs_dir()
        .context("Failed to resolve the logs directory")?;
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}
