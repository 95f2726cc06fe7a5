//! Error types for siteblock-hosts.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or writing the hosts file and its backup.
#[derive(Debug, Error)]
pub enum HostsError {
    /// Writing needs elevated privileges. Kept apart from [`HostsError::Io`]
    /// so callers can ask the user to re-run as administrator/root.
    #[error("permission denied writing {path}; run as administrator/root")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `restore` was requested but no backup has been taken.
    #[error("no hosts backup found at {path}")]
    BackupNotFound { path: PathBuf },
}

impl HostsError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Failures of the best-effort platform capabilities.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("no DNS cache flush method succeeded on this platform")]
    NoFlushMethod,
}

/// Map an I/O error at `path`, splitting out permission failures.
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> HostsError {
    let path = path.into();
    if source.kind() == std::io::ErrorKind::PermissionDenied {
        HostsError::PermissionDenied { path }
    } else {
        HostsError::Io { path, source }
    }
}
