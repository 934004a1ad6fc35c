//! File logging.
//!
//! The terminal is the UI, so logs go to a daily-rolling file. Filtered by
//! `PRM_LOG` (an `EnvFilter` directive), defaulting to `prm=info`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "PRM_LOG";

const DEFAULT_DIRECTIVE: &str = "prm=info";

const LOG_FILE_PREFIX: &str = "prm.log";

/// Keeps the background writer alive; logs stop when dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Returns the default log directory.
///
/// On Linux: ~/.local/share/prm/logs/
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prm")
        .join("logs")
}

/// Filter from `PRM_LOG`, or the default directive.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber writing under `log_dir`.
///
/// Returns `None` if neither `log_dir` nor a temp fallback is usable, or if a
/// subscriber is already installed; the application then runs without logs.
pub fn init(log_dir: &Path) -> Option<LoggingGuard> {
    let log_dir = fs::create_dir_all(log_dir)
        .map(|()| log_dir.to_path_buf())
        .or_else(|_| -> std::io::Result<PathBuf> {
            let dir = std::env::temp_dir().join("prm").join("logs");
            fs::create_dir_all(&dir)?;
            Ok(dir)
        })
        .ok()?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry().with(env_filter()).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true),
    );

    if subscriber.try_init().is_err() {
        return None;
    }

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Some(LoggingGuard { _guard: guard })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_dir_is_reasonable() {
        assert!(default_log_dir().ends_with("prm/logs"));
    }

    #[test]
    fn default_filter_targets_the_crate() {
        // PRM_LOG is not set by the test harness
        if std::env::var_os(LOG_ENV).is_none() {
            assert_eq!(env_filter().to_string(), DEFAULT_DIRECTIVE);
        }
    }
}
