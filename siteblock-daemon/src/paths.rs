use std::path::{Path, PathBuf};
use std::time::Duration;

pub const STATE_FILE: &str = "state.json";
pub const HOSTS_BACKUP_FILE: &str = "hosts.backup";
pub const DAEMON_SOCKET: &str = "daemon.sock";

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(60);

pub fn siteblock_root(home: &Path) -> PathBuf {
    home.join(".siteblock")
}

pub fn state_path(home: &Path) -> PathBuf {
    siteblock_root(home).join(STATE_FILE)
}

pub fn backup_path(home: &Path) -> PathBuf {
    siteblock_root(home).join(HOSTS_BACKUP_FILE)
}

pub fn socket_path(home: &Path) -> PathBuf {
    siteblock_root(home).join(DAEMON_SOCKET)
}
