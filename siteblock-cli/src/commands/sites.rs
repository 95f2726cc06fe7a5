//! `siteblock add|remove|list|clear`: block list management.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Deserialize;

use siteblock_core::Domain;
use siteblock_daemon::DaemonRequest;

use super::{plural, print_json, Session};

#[derive(Debug, Deserialize)]
struct DomainReply {
    domain: Domain,
}

#[derive(Debug, Deserialize)]
struct ClearReply {
    removed: usize,
}

/// Arguments for `siteblock add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Site to block, e.g. `youtube.com` or `https://www.reddit.com`.
    pub site: String,
}

impl AddArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let reply: DomainReply = session.call_as(DaemonRequest::Add { site: self.site })?;
        println!("Added {}", reply.domain.as_str().bold());
        Ok(())
    }
}

/// Arguments for `siteblock remove`.
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Site to unblock.
    pub site: String,
}

impl RemoveArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let reply: DomainReply = session.call_as(DaemonRequest::Remove { site: self.site })?;
        println!("Removed {}", reply.domain.as_str().bold());
        Ok(())
    }
}

/// Arguments for `siteblock list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let domains: Vec<Domain> = session.call_as(DaemonRequest::List)?;
        if self.json {
            return print_json(&domains);
        }
        if domains.is_empty() {
            println!("No sites blocked.");
            return Ok(());
        }
        for domain in &domains {
            println!("{domain}");
        }
        Ok(())
    }
}

pub fn clear(session: &Session) -> Result<()> {
    let reply: ClearReply = session.call_as(DaemonRequest::Clear)?;
    println!("Removed {}.", plural(reply.removed, "site"));
    Ok(())
}
