//! Relay error types.

use std::fmt;

use crate::replay::ReplayError;

/// Errors surfaced by the relay runtime.
///
/// Per-message failures never show up here: they become that message's
/// [`Outcome`](crate::Outcome). These are the failures of the runtime
/// around the pipeline.
#[derive(Debug)]
pub enum RelayError {
    /// Configuration error (zero concurrency limit, unusable paths, etc.).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// I/O error opening an adapter's backing file or starting a feed thread.
    Io(String),

    /// Historical replay was rejected or failed.
    Replay(ReplayError),

    /// Internal error (a feed thread panicked or could not be joined).
    ///
    /// Indicates a bug.
    Internal(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Replay(err) => write!(f, "replay error: {err}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Replay(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ReplayError> for RelayError {
    fn from(err: ReplayError) -> Self {
        Self::Replay(err)
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
