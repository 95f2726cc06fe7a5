//! Error types for siteblock-core.

use std::path::PathBuf;

use thiserror::Error;

/// Validation failures for user-supplied domains and schedules.
///
/// None of these mutate state; the caller gets the error and the block list
/// and schedule set stay as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The input did not normalize to a valid DNS name.
    #[error("invalid domain '{input}': expected something like example.com")]
    InvalidDomain { input: String },

    /// A schedule boundary was not a 24-hour `HH:MM` value.
    #[error("malformed time '{input}': use HH:MM (e.g. 09:00)")]
    MalformedTime { input: String },

    /// A schedule was created without any days.
    #[error("a schedule needs at least one day")]
    EmptyDaySet,

    /// A day name that is not one of Monday..Sunday.
    #[error("unknown day '{input}'")]
    UnknownDay { input: String },
}

/// All errors that can arise from snapshot persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (write/save path).
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot file exists but is not a snapshot.
    #[error("corrupt snapshot at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot file did not exist at the expected path.
    #[error("snapshot not found at {path}")]
    NotFound { path: PathBuf },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
