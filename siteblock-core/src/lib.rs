//! siteblock core library: domains, block list, schedules, snapshot persistence.
//!
//! - [`domain`]: [`normalize`] and the [`Domain`] newtype
//! - [`block_list`]: ordered, deduplicated [`BlockList`]
//! - [`schedule`]: [`Day`], [`TimeOfDay`], [`Schedule`], [`ScheduleSet`]
//! - [`store`]: [`Snapshot`] and the [`SnapshotStore`] capability
//! - [`error`]: [`CoreError`], [`StoreError`]

pub mod block_list;
pub mod domain;
pub mod error;
pub mod schedule;
pub mod store;

pub use block_list::{AddOutcome, BlockList, RemoveOutcome};
pub use domain::{normalize, Domain};
pub use error::{CoreError, StoreError};
pub use schedule::{Day, Schedule, ScheduleSet, TimeOfDay};
pub use store::{
    read_snapshot_at, write_snapshot_at, JsonFileStore, MemoryStore, Snapshot, SnapshotStore,
    SNAPSHOT_VERSION,
};
