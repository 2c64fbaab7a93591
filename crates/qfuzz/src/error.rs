//! Error taxonomy for generation, execution and aggregation.
//!
//! Every failure carries its specific kind: callers can match on [`Error`]
//! directly or use [`Error::kind`] to decide on a retry policy without
//! inspecting payloads.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::harness::Repetitions;
use crate::service::ProviderError;

pub use qfuzz_core::InvalidInput;

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// A local precondition was violated. Never retried.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    /// A collaborator call failed for a backend-side reason.
    #[error("{operation} on backend {backend:?} failed: {source}")]
    Provider {
        /// Backend the call was made for.
        backend: String,
        /// Which collaborator call failed (`compile`, `submit`, `fetch_profile`, ...).
        operation: &'static str,
        /// Underlying collaborator error.
        #[source]
        source: ProviderError,
    },

    /// A submitted job reached the `Failed` state.
    #[error("execution on backend {backend:?} failed at repetition {repetition}: {message}")]
    ExecutionFailure {
        /// Backend the job ran on.
        backend: String,
        /// 1-based repetition that failed.
        repetition: usize,
        /// Error message reported by the execution engine.
        message: String,
    },

    /// The wait loop was cancelled before a terminal state was observed.
    #[error("gave up waiting on backend {backend:?} at repetition {repetition} after {waited:?}")]
    Timeout {
        /// Backend the job ran on.
        backend: String,
        /// 1-based repetition that was pending.
        repetition: usize,
        /// Time spent on the pair before giving up.
        waited: Duration,
    },

    /// Reading or writing the noise profile cache failed.
    #[error("noise cache at {}: {source}", path.display())]
    Cache {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other I/O failure (output files, program artifacts).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure kind, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`Error::InvalidInput`].
    InvalidInput,
    /// See [`Error::Provider`].
    Provider,
    /// See [`Error::ExecutionFailure`].
    ExecutionFailure,
    /// See [`Error::Timeout`].
    Timeout,
    /// Cache, serialization or other I/O failure.
    Storage,
}

impl ErrorKind {
    /// Lowercase name for tables and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Provider => "provider",
            Self::ExecutionFailure => "execution_failure",
            Self::Timeout => "timeout",
            Self::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// The failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::ExecutionFailure { .. } => ErrorKind::ExecutionFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cache { .. } | Self::Serialization(_) | Self::Io(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn provider<'a>(
        backend: &'a str,
        operation: &'static str,
    ) -> impl FnOnce(ProviderError) -> Self + 'a {
        move |source| Self::Provider {
            backend: backend.to_string(),
            operation,
            source,
        }
    }
}

/// A harness run that stopped early.
///
/// `partial` holds every repetition that completed before `error`; those
/// results remain valid.
#[derive(Debug, Error)]
#[error("{error} ({completed} repetitions completed)", completed = .partial.len())]
pub struct RunError {
    /// Repetitions completed before the failure.
    pub partial: Repetitions,
    /// Why the run stopped.
    #[source]
    pub error: Error,
}

impl RunError {
    /// The failure kind.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Crate result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
