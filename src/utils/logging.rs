use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::{non_blocking::WorkerGuard, rolling::Rotation};
use tracing_subscriber::{fmt::writer::MakeWriterExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "focustrack";
const LOG_DIR: &str = "logs";
const KEPT_LOG_FILES: usize = 5;

/// Flushes buffered log lines when dropped. Hold it until the program exits.
#[must_use]
pub struct LoggingGuard(#[allow(dead_code)] WorkerGuard);

/// Logs go to daily rotated files in `<app>/logs`, written off the timer's thread.
///
/// Without `verbose` the level comes from `RUST_LOG` and defaults to info for this crate. With it
/// everything down to trace is logged and mirrored to stderr, stdout stays reserved for the
/// countdown and command output.
pub fn enable_logging(application_data_path: &Path, verbose: bool) -> Result<LoggingGuard> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(application_data_path.join(LOG_DIR))?;
    let (file, guard) = tracing_appender::non_blocking(appender);

    let stderr = std::io::stderr.with_filter(move |_| verbose);

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_ansi(false)
        .with_writer(stderr.and(file))
        .init();
    Ok(LoggingGuard(guard))
}

fn log_filter(verbose: bool) -> EnvFilter {
    let crate_name = env!("CARGO_PKG_NAME").replace('-', "_");
    if verbose {
        return EnvFilter::new(format!("{crate_name}={}", LevelFilter::TRACE));
    }
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{crate_name}={}", LevelFilter::INFO)))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});

#[cfg(test)]
mod tests {
    use super::log_filter;

    #[test]
    fn verbose_logs_everything_of_this_crate() {
        assert_eq!(log_filter(true).to_string(), "focustrack=trace");
    }
}
