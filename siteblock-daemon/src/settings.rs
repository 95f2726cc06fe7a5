//! Runtime settings: built-in defaults, overridden by environment variables,
//! overridden in turn by CLI flags (applied by the caller).

use std::path::{Path, PathBuf};
use std::time::Duration;

use siteblock_hosts::default_hosts_path;

use crate::paths::{backup_path, DEFAULT_TICK_PERIOD};

pub const ENV_HOSTS_FILE: &str = "SITEBLOCK_HOSTS_FILE";
pub const ENV_TICK_SECS: &str = "SITEBLOCK_TICK_SECS";
pub const ENV_STICKY_MANUAL: &str = "SITEBLOCK_STICKY_MANUAL";
pub const ENV_SKIP_DNS_FLUSH: &str = "SITEBLOCK_SKIP_DNS_FLUSH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Hosts file the block is written into.
    pub hosts_path: PathBuf,
    /// Where `backup` copies the hosts file to.
    pub backup_path: PathBuf,
    /// Interval between scheduler ticks.
    pub tick_period: Duration,
    /// When set, ticks never end a block that was switched on by hand.
    pub sticky_manual: bool,
    /// Flush the OS resolver cache after every hosts-file transition.
    pub flush_dns: bool,
}

impl Settings {
    /// Defaults for a user whose home directory is `home`.
    pub fn for_home(home: &Path) -> Self {
        Self {
            hosts_path: default_hosts_path(),
            backup_path: backup_path(home),
            tick_period: DEFAULT_TICK_PERIOD,
            sticky_manual: false,
            flush_dns: true,
        }
    }

    /// Defaults overridden by the process environment.
    pub fn from_env(home: &Path) -> Self {
        Self::from_lookup(home, |key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(home: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::for_home(home);

        if let Some(path) = lookup(ENV_HOSTS_FILE).filter(|v| !v.trim().is_empty()) {
            settings.hosts_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_TICK_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => settings.tick_period = Duration::from_secs(secs),
                _ => tracing::warn!(
                    var = ENV_TICK_SECS,
                    value = %raw,
                    "ignoring invalid tick period, expected a positive number of seconds",
                ),
            }
        }
        if let Some(raw) = lookup(ENV_STICKY_MANUAL) {
            settings.sticky_manual = parse_flag(ENV_STICKY_MANUAL, &raw, settings.sticky_manual);
        }
        if let Some(raw) = lookup(ENV_SKIP_DNS_FLUSH) {
            settings.flush_dns = !parse_flag(ENV_SKIP_DNS_FLUSH, &raw, !settings.flush_dns);
        }
        settings
    }

    pub fn with_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_path = path.into();
        self
    }
}

fn parse_flag(var: &str, raw: &str, fallback: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        _ => {
            tracing::warn!(var, value = %raw, "ignoring invalid boolean");
            fallback
        }
    }
}
