//! Logging setup on top of `tracing`

use crate::config::{LogRotation, LoggingOptions};
use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber: stdout always, plus a file sink when configured.
///
/// Does nothing if a subscriber is already installed.
pub fn init(options: &LoggingOptions) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = env_filter(&options.level)?;

    let stdout = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(io::stdout)
        .with_ansi(options.color)
        .with_target(true)
        .boxed();

    let file = match options.file.as_deref() {
        Some(path) => {
            let writer = file_writer(path, options.rotation)?;
            Some(
                fmt::layer()
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .boxed(),
            )
        }
        None => None,
    };

    Registry::default()
        .with(filter)
        .with(stdout)
        .with(file)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

/// Build the level filter; `LINKQR_LOG_LEVEL` has already been folded into `level`.
fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).map_err(|e| Error::Config(format!("Invalid log level '{level}': {e}")))
}

fn file_writer(path: &Path, rotation: Option<LogRotation>) -> Result<NonBlocking> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::Config(format!(
            "Failed to create log directory {}: {e}",
            dir.display()
        ))
    })?;

    let builder = NonBlockingBuilder::default().lossy(false);
    let (writer, guard) = match rotation {
        Some(rotation) => {
            let file_name = path.file_name().ok_or_else(|| {
                Error::Config(format!(
                    "Log file path '{}' must include a filename when rotation is enabled",
                    path.display()
                ))
            })?;
            let appender = match rotation {
                LogRotation::Hourly => rolling::hourly(dir, file_name),
                LogRotation::Daily => rolling::daily(dir, file_name),
            };
            builder.finish(appender)
        }
        None => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .map_err(|e| {
                    Error::Config(format!("Failed to open log file {}: {e}", path.display()))
                })?;
            builder.finish(file)
        }
    };

    // Keeps the background writer thread alive for the life of the process.
    let _ = FILE_GUARD.set(guard);
    Ok(writer)
}
