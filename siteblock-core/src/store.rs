//! Snapshot persistence.
//!
//! # On-disk format
//!
//! ```text
//! {
//!   "blocked_sites": ["example.com", ...],
//!   "scheduled_blocks": [
//!     { "start_time": "09:00", "end_time": "17:00", "days": ["Monday", ...] }
//!   ],
//!   "version": "2.0"
//! }
//! ```
//!
//! Loading is lenient: missing fields default to empty collections, unknown
//! fields are ignored, and entries that no longer validate are skipped with
//! a warning. Writes are atomic: serialize → `.json.tmp` sibling →
//! `chmod 0600` → `rename`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block_list::BlockList;
use crate::domain::normalize;
use crate::error::{io_err, StoreError};
use crate::schedule::{Day, Schedule, ScheduleSet};

/// Version string written into every snapshot.
pub const SNAPSHOT_VERSION: &str = "2.0";

/// The persisted block list and schedule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub blocked_sites: BlockList,
    pub scheduled_blocks: ScheduleSet,
    pub version: String,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            blocked_sites: BlockList::new(),
            scheduled_blocks: ScheduleSet::new(),
            version: SNAPSHOT_VERSION.to_string(),
        }
    }
}

impl Snapshot {
    pub fn new(blocked_sites: BlockList, scheduled_blocks: ScheduleSet) -> Self {
        Self {
            blocked_sites,
            scheduled_blocks,
            version: SNAPSHOT_VERSION.to_string(),
        }
    }

    /// Parse snapshot JSON, skipping entries that fail validation.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let file: SnapshotFile = serde_json::from_str(contents)?;
        Ok(file.into_snapshot())
    }
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

/// Entries are kept as raw values so one bad entry cannot sink the file.
#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    blocked_sites: Vec<Value>,
    #[serde(default)]
    scheduled_blocks: Vec<Value>,
    #[serde(default)]
    version: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ScheduleRecord {
    start_time: String,
    end_time: String,
    #[serde(default)]
    days: Vec<String>,
}

impl SnapshotFile {
    fn into_snapshot(self) -> Snapshot {
        let mut blocked_sites = BlockList::new();
        for value in self.blocked_sites {
            let Some(site) = value.as_str() else {
                tracing::warn!(entry = %value, "skipping stored domain: not a string");
                continue;
            };
            match normalize(site) {
                Ok(domain) => {
                    blocked_sites.add(domain);
                }
                Err(err) => tracing::warn!(site = %site, error = %err, "skipping stored domain"),
            }
        }

        let mut scheduled_blocks = ScheduleSet::new();
        for value in self.scheduled_blocks {
            let record = match serde_json::from_value::<ScheduleRecord>(value.clone()) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(entry = %value, error = %err, "skipping stored schedule");
                    continue;
                }
            };
            match record.into_schedule() {
                Ok(schedule) => scheduled_blocks.push(schedule),
                Err(err) => tracing::warn!(error = %err, "skipping stored schedule"),
            }
        }

        let version = match self.version {
            Some(Value::String(version)) => version,
            _ => SNAPSHOT_VERSION.to_string(),
        };
        Snapshot {
            blocked_sites,
            scheduled_blocks,
            version,
        }
    }
}

impl ScheduleRecord {
    fn into_schedule(self) -> Result<Schedule, crate::CoreError> {
        let days = self
            .days
            .iter()
            .map(|d| d.parse::<Day>())
            .collect::<Result<Vec<_>, _>>()?;
        Schedule::parse(&self.start_time, &self.end_time, days)
    }
}

// ---------------------------------------------------------------------------
// Load / save at an explicit path
// ---------------------------------------------------------------------------

/// Strict load: a missing file is [`StoreError::NotFound`], malformed JSON is
/// [`StoreError::Corrupt`]. Used by import, where the caller named the file.
pub fn read_snapshot_at(path: &Path) -> Result<Snapshot, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Snapshot::from_json(&contents).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically write `snapshot` to `path`, creating the parent directory.
pub fn write_snapshot_at(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Store abstraction
// ---------------------------------------------------------------------------

/// Load/save capability injected into the controller.
pub trait SnapshotStore: Send {
    /// Never fails: missing or corrupt state yields an empty snapshot.
    fn load(&self) -> Snapshot;

    /// Overwrite the persisted form wholesale.
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// JSON file store (`~/.siteblock/state.json` in production).
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Snapshot {
        match read_snapshot_at(&self.path) {
            Ok(snapshot) => snapshot,
            Err(StoreError::NotFound { .. }) => {
                tracing::debug!(path = %self.path.display(), "no saved state, starting empty");
                Snapshot::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable saved state");
                Snapshot::default()
            }
        }
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        write_snapshot_at(&self.path, snapshot)
    }
}

/// In-memory store. Clones share the same contents, so a test can keep a
/// handle after moving the store into a controller.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    snapshot: Option<Snapshot>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::default();
        store.lock().snapshot = Some(snapshot);
        store
    }

    /// Make every subsequent save fail.
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    pub fn saved(&self) -> Option<Snapshot> {
        self.lock().snapshot.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Snapshot {
        self.lock().snapshot.clone().unwrap_or_default()
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.fail_saves {
            return Err(io_err(
                "<memory>",
                std::io::Error::other("memory store configured to fail"),
            ));
        }
        inner.snapshot = Some(snapshot.clone());
        inner.saves += 1;
        Ok(())
    }
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
