//! Tracing subscriber setup
//!
//! Logs go to a daily-rolling file in the log directory, and to stderr as
//! well when running verbose. `RUST_LOG` overrides the default `info` level.

use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Prefix of the daily log files, suffixed with the date by the appender
pub const LOG_FILE_PREFIX: &str = "proxy.log";

/// Installs the global subscriber
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the life of the process.
pub fn init(log_dir: &Path, verbose: bool) -> WorkerGuard {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };

    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true)
        .with_filter(env_filter(default_level));

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(env_filter(default_level))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), "logger initialized");
    guard
}

fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}
