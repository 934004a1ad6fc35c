//! Error types.
//!
//! - `SourceError`: the on-disk source catalog and its providers
//! - `StateError`: raised by UI states; recoverable from `input()`,
//!   fatal from `enter()` / `exit()`
//! - `AppError`: anything that ends the main loop

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reading or writing sources and projects.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Bad source metadata in {path}: {source}")]
    BadMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl SourceError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> SourceError {
        let path = path.into();
        move |source| SourceError::Io { path, source }
    }
}

/// Failure raised by a UI state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Bad transition payload for {state}: {reason}")]
    BadPayload {
        state: &'static str,
        reason: &'static str,
    },

    #[error("No state registered as {0}")]
    Unregistered(&'static str),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Failure that terminates the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Terminal I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("State transition failed: {0}")]
    State(#[from] StateError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        assert_eq!(
            StateError::InvalidSelection("Invalid source ID".into()).to_string(),
            "Invalid selection: Invalid source ID"
        );
        assert_eq!(
            SourceError::UnknownProvider("ftp".into()).to_string(),
            "Unknown provider: ftp"
        );
    }

    #[test]
    fn source_errors_pass_through_state_errors() {
        let err: StateError = SourceError::NotFound("abc".into()).into();
        assert_eq!(err.to_string(), "Source not found: abc");
    }

    #[test]
    fn io_helper_keeps_the_path() {
        let err = SourceError::io("/tmp/x")(io::Error::other("boom"));
        assert!(err.to_string().contains("/tmp/x"));
        assert!(err.to_string().contains("boom"));
    }
}
