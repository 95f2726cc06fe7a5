//! `siteblock diff`: unified diff of what `on` would write.

use anyhow::Result;
use serde::Deserialize;

use siteblock_daemon::DaemonRequest;

use super::Session;

#[derive(Debug, Deserialize)]
struct DiffReply {
    diff: String,
}

pub fn run(session: &Session) -> Result<()> {
    let reply: DiffReply = session.call_as(DaemonRequest::Diff)?;
    if reply.diff.is_empty() {
        println!("No differences: the hosts file already blocks every listed site.");
        return Ok(());
    }
    print!("{}", reply.diff);
    if !reply.diff.ends_with('\n') {
        println!();
    }
    Ok(())
}
