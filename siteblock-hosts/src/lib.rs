//! Hosts-file editing for siteblock.
//!
//! [`editor`] holds the pure text transforms that add and remove the managed
//! block. [`HostsFile`] wraps them with whole-file atomic I/O, and
//! [`Platform`] covers the OS-specific bits (privilege check, DNS flush).

pub mod editor;
pub mod error;
pub mod file;
pub mod platform;

pub use editor::{BLOCK_ADDRESS, MARKER};
pub use error::{HostsError, PlatformError};
pub use file::{default_hosts_path, write_atomic, HostsFile, WriteOutcome};
pub use platform::{NoopPlatform, Platform, SystemPlatform};
