//! `siteblock export|import`: move sites and schedules between machines.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use siteblock_daemon::{DaemonRequest, ImportSummary};

use super::{plural, Session};

#[derive(Debug, Deserialize)]
struct ExportReply {
    path: PathBuf,
}

/// Arguments for `siteblock export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// File to write.
    pub path: PathBuf,
}

impl ExportArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let path = absolute(self.path)?;
        let reply: ExportReply = session.call_as(DaemonRequest::Export { path })?;
        println!("Exported to {}", reply.path.display());
        Ok(())
    }
}

/// Arguments for `siteblock import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// File written by `siteblock export` (or an older config file).
    pub path: PathBuf,
}

impl ImportArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let path = absolute(self.path)?;
        let summary: ImportSummary = session.call_as(DaemonRequest::Import { path })?;
        println!(
            "Imported {} and {} from {}",
            plural(summary.domains, "site"),
            plural(summary.schedules, "schedule"),
            summary.path.display()
        );
        Ok(())
    }
}

/// The daemon has its own working directory, so relative paths are resolved
/// here.
fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().context("could not determine current directory")?;
    Ok(cwd.join(path))
}
