//! Tracing setup for the server binary.
//!
//! Development prints pretty, span-annotated output to stdout. Production
//! writes one JSON object per event to a daily file in the configured log
//! directory, so every scan decision stays queryable, and mirrors a compact
//! line to stdout for the service manager.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use turnstile_core::Config;

/// Environment variable holding the fallback filter when `RUST_LOG` is unset.
pub const LOG_LEVEL_ENV: &str = "TURNSTILE_LOG_LEVEL";

/// Prefix of the daily log files; the appender adds the date.
const LOG_FILE_PREFIX: &str = "turnstile-server.log";

/// Non-blocking writer guards, kept for the life of the process so buffered
/// lines are flushed on exit.
static GUARDS: OnceLock<[WorkerGuard; 2]> = OnceLock::new();

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Pretty output on stdout only.
    Stdout,
    /// JSON files in the directory plus compact stdout.
    Files(PathBuf),
}

impl LogTarget {
    /// Pick the target for `config`: files under [`Config::log_dir`] in
    /// production, stdout otherwise.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        if config.server.production {
            Self::Files(config.log_dir())
        } else {
            Self::Stdout
        }
    }
}

/// Install the global subscriber for `config`.
///
/// # Errors
///
/// Returns an error if the filter cannot be parsed, the log directory
/// cannot be created, or a subscriber is already installed.
pub fn init(config: &Config) -> anyhow::Result<()> {
    let filter = env_filter()?;
    match LogTarget::from_config(config) {
        LogTarget::Stdout => init_stdout(filter),
        LogTarget::Files(dir) => init_files(filter, &dir),
    }
}

/// `RUST_LOG` if set, else `TURNSTILE_LOG_LEVEL`, else `info`.
fn env_filter() -> anyhow::Result<EnvFilter> {
    let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?)
}

fn init_files(filter: EnvFilter, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    let _ = GUARDS.set([file_guard, stdout_guard]);
    tracing::info!(log_dir = %dir.display(), "File logging enabled");
    Ok(())
}

fn init_stdout(filter: EnvFilter) -> anyhow::Result<()> {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .try_init()?;
    Ok(())
}
