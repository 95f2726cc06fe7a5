//! `siteblock backup|restore`: copy of the hosts file before editing.

use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;

use siteblock_daemon::DaemonRequest;

use super::Session;

#[derive(Debug, Deserialize)]
struct BackupReply {
    path: PathBuf,
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct RestoreReply {
    path: PathBuf,
    changed: bool,
}

pub fn backup(session: &Session) -> Result<()> {
    let reply: BackupReply = session.call_as(DaemonRequest::Backup)?;
    println!(
        "Backed up hosts file to {} ({} bytes)",
        reply.path.display(),
        reply.bytes
    );
    Ok(())
}

pub fn restore(session: &Session) -> Result<()> {
    let reply: RestoreReply = session.call_as(DaemonRequest::Restore)?;
    if reply.changed {
        println!("Restored hosts file from {}", reply.path.display());
    } else {
        println!("Hosts file already matches {}", reply.path.display());
    }
    Ok(())
}
