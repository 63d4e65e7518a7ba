//! Logging infrastructure for churnflow.
//!
//! Logs go to the console and to daily-rotated files in a log directory:
//!
//! - `churnflow.<date>.log`: every level allowed by the env filter
//! - `error.<date>.log`: warnings and errors only
//!
//! The default level is `info`; set `RUST_LOG=debug` for more detail.
//!
//! ```no_run
//! churnflow::logging::init("logs").expect("Failed to initialize logging");
//! tracing::info!("ETL run started");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const MAX_LOG_FILES: usize = 10;
const ALL_LOGS_PREFIX: &str = "churnflow";
const ERROR_LOGS_PREFIX: &str = "error";
const DEFAULT_LEVEL: &str = "info";

/// Creates `log_dir` if needed and returns it.
pub fn ensure_log_dir(log_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Cannot create log directory {}", log_dir.display()))?;
    Ok(log_dir.to_path_buf())
}

fn daily_appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Cannot open {prefix} log in {}", log_dir.display()))
}

/// Plain-text layer with source locations for a log file.
fn file_layer<S>(writer: RollingFileAppender) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(writer)
}

/// Installs the global subscriber: console, every level to
/// `churnflow.<date>.log`, warnings and errors to `error.<date>.log`.
///
/// # Errors
///
/// Fails if the log directory or an appender cannot be created, or if a
/// subscriber is already installed.
pub fn init(log_dir: impl AsRef<Path>) -> Result<()> {
    let log_dir = ensure_log_dir(log_dir)?;
    let all_logs = daily_appender(&log_dir, ALL_LOGS_PREFIX)?;
    let error_logs = daily_appender(&log_dir, ERROR_LOGS_PREFIX)?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(DEFAULT_LEVEL).context("Invalid default log level")?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .with(file_layer(all_logs))
        .with(file_layer(error_logs).with_filter(LevelFilter::WARN))
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!("Logging to {}", log_dir.display());
    Ok(())
}

/// Path of today's all-levels log file. The appender rotates on UTC dates.
pub fn current_log_path(log_dir: impl AsRef<Path>) -> PathBuf {
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    log_dir.as_ref().join(format!("churnflow.{today}.log"))
}
