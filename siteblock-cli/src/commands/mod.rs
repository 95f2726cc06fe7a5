pub mod backup;
pub mod blocking;
pub mod daemon;
pub mod diff;
pub mod schedule;
pub mod sites;
pub mod snapshot;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use siteblock_core::JsonFileStore;
use siteblock_daemon::paths::state_path;
use siteblock_daemon::{Controller, DaemonError, DaemonRequest, Settings};
use siteblock_hosts::{HostsFile, SystemPlatform};

/// Where a command runs: the daemon when one answers on its socket, an
/// in-process controller otherwise.
#[derive(Debug, Clone)]
pub struct Session {
    home: PathBuf,
    settings: Settings,
}

impl Session {
    pub fn new(hosts_file: Option<PathBuf>) -> Result<Self> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let mut settings = Settings::from_env(&home);
        if let Some(path) = hosts_file {
            settings.hosts_path = path;
        }
        Ok(Self { home, settings })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn call(&self, request: DaemonRequest) -> Result<Value> {
        let result = match siteblock_daemon::request(&self.home, &request) {
            Err(DaemonError::DaemonNotRunning { .. }) => self.call_local(&request),
            other => other,
        };
        result.map_err(|err| explain(err, request.name()))
    }

    pub fn call_as<T: DeserializeOwned>(&self, request: DaemonRequest) -> Result<T> {
        let name = request.name();
        let data = self.call(request)?;
        serde_json::from_value(data).with_context(|| format!("unexpected response to `{name}`"))
    }

    fn call_local(&self, request: &DaemonRequest) -> Result<Value, DaemonError> {
        let mut controller = self.controller();
        Ok(controller.handle(request)?)
    }

    fn controller(&self) -> Controller {
        let mut controller = Controller::new(
            Box::new(JsonFileStore::new(state_path(&self.home))),
            HostsFile::new(&self.settings.hosts_path),
            Arc::new(SystemPlatform::new(&self.settings.hosts_path)),
            self.settings.clone(),
        );
        controller.adopt_existing_block();
        controller
    }
}

fn explain(err: DaemonError, cmd: &str) -> anyhow::Error {
    let hint = if err.is_permission_denied() {
        format!("`{cmd}` needs write access to the hosts file; re-run as administrator/root")
    } else {
        format!("`{cmd}` failed")
    };
    anyhow::Error::new(err).context(hint)
}

/// `"1 site"`, `"2 sites"`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON")?
    );
    Ok(())
}
