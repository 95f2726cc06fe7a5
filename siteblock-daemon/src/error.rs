use std::path::PathBuf;

use thiserror::Error;

use siteblock_core::{CoreError, Domain, StoreError};
use siteblock_hosts::HostsError;

/// Failures of a single controller operation.
///
/// Every variant maps to a stable [`kind`](ControllerError::kind) string that
/// travels over the daemon socket next to the message.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Domain or schedule input that failed validation.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("{domain} is already in the block list")]
    DuplicateDomain { domain: Domain },

    #[error("{domain} is not in the block list")]
    DomainNotFound { domain: Domain },

    #[error("no schedule at index {index} ({len} configured)")]
    ScheduleNotFound { index: usize, len: usize },

    #[error("the block list is empty; add a site first")]
    EmptyBlockList,

    #[error(transparent)]
    Hosts(#[from] HostsError),

    /// The mutation was applied in memory but could not be saved.
    #[error("change applied but not saved: {0}")]
    Persist(#[source] StoreError),

    /// Export or import of a snapshot file failed.
    #[error(transparent)]
    Snapshot(StoreError),
}

impl ControllerError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Invalid(CoreError::InvalidDomain { .. }) => "invalid_domain",
            Self::Invalid(CoreError::MalformedTime { .. }) => "malformed_time",
            Self::Invalid(CoreError::EmptyDaySet) => "empty_day_set",
            Self::Invalid(CoreError::UnknownDay { .. }) => "unknown_day",
            Self::DuplicateDomain { .. } => "duplicate_domain",
            Self::DomainNotFound { .. } => "domain_not_found",
            Self::ScheduleNotFound { .. } => "schedule_not_found",
            Self::EmptyBlockList => "empty_block_list",
            Self::Hosts(HostsError::PermissionDenied { .. }) => "permission_denied",
            Self::Hosts(HostsError::BackupNotFound { .. }) => "backup_not_found",
            Self::Hosts(HostsError::Io { .. }) => "io",
            Self::Persist(_) => "persist",
            Self::Snapshot(StoreError::Corrupt { .. } | StoreError::Json(_)) => "corrupt_snapshot",
            Self::Snapshot(StoreError::NotFound { .. }) => "not_found",
            Self::Snapshot(StoreError::Io { .. }) => "io",
        }
    }
}

/// Error surface for the daemon runtime and socket protocol.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// An operation failed inside a running daemon.
    #[error("{message}")]
    Remote { message: String, kind: String },

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("daemon protocol error: {0}")]
    Protocol(String),

    #[error("daemon is not running (socket missing: {socket})")]
    DaemonNotRunning { socket: PathBuf },
}

impl DaemonError {
    /// Error taxonomy entry, when the failure came from a controller
    /// operation (local or remote).
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Controller(err) => Some(err.kind()),
            Self::Remote { kind, .. } => Some(kind.as_str()),
            _ => None,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.kind() == Some("permission_denied")
    }
}

#[cfg_attr(not(unix), allow(dead_code))]
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
