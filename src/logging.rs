//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! - **Service** ([`init`]): console layer in the configured [`LogFormat`],
//!   plus a daily-rotated JSON file when `logging.dir` is set
//! - **CLI** ([`init_cli`]): human-readable stderr for one-shot subcommands
//!
//! The filter is `RUST_LOG` when set, else [`filter_directives`] over the
//! configured level.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Rotated log file prefix inside `logging.dir`.
pub const LOG_FILE_PREFIX: &str = "sift.log";

/// Dependencies that are chatty at `info` and only useful when debugging them.
const QUIET_TARGETS: [&str; 3] = ["sqlx", "hyper", "reqwest"];

/// Holds the non-blocking writer guard for file logging.
///
/// Dropping it flushes pending entries and closes the file.
#[derive(Debug)]
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Filter directives for `level`.
///
/// A bare level also caps [`QUIET_TARGETS`] at `warn`; a value that already
/// names targets (`sift=debug,sqlx=info`) is used as written.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    let level = if level.is_empty() { "info" } else { level };
    if level.contains('=') {
        return level.to_owned();
    }
    std::iter::once(level.to_owned())
        .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
        .collect::<Vec<_>>()
        .join(",")
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(level)))
}

/// Non-blocking daily-rotated writer under `dir`, creating it if needed.
fn file_writer(dir: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create logs directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialise logging for `sift serve`.
///
/// Returns a guard when a file layer was installed; keep it alive for the
/// life of the process.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<LoggingGuard>> {
    let (file_layer, guard) = match config.dir.as_deref() {
        Some(dir) => {
            let (writer, guard) = file_writer(dir)?;
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(LoggingGuard { _guard: guard }))
        }
        None => (None, None),
    };

    let (json_console, pretty_console) = match config.console {
        LogFormat::Json => (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(file_layer)
        .with(json_console)
        .with(pretty_console)
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(guard)
}

/// Initialise console-only logging for one-shot subcommands.
///
/// A second call in the same process is a no-op.
pub fn init_cli(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .try_init();
}
