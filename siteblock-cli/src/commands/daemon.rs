//! `siteblock daemon`: background scheduler lifecycle.

use anyhow::{Context, Result};
use clap::Subcommand;

use siteblock_daemon::paths::socket_path;
use siteblock_daemon::{request_status, request_stop, DaemonError};

use super::{print_json, Session};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the scheduler in the foreground until ctrl-c or `daemon stop`.
    Start,
    /// Request graceful daemon shutdown over the Unix socket.
    Stop,
    /// Query daemon runtime status over the Unix socket.
    Status,
}

pub fn run(command: DaemonCommand, session: Session) -> Result<()> {
    let home = session.home();

    match command {
        DaemonCommand::Start => start(&session)?,
        DaemonCommand::Stop => match request_stop(home) {
            Ok(()) => println!("daemon stop requested"),
            Err(DaemonError::DaemonNotRunning { .. }) => {
                println!("daemon is not running");
            }
            Err(err) => return Err(err).context("failed to stop daemon"),
        },
        DaemonCommand::Status => match request_status(home) {
            Ok(status) => print_json(&status)?,
            Err(DaemonError::DaemonNotRunning { .. }) => {
                let payload = serde_json::json!({
                    "running": false,
                    "socket": socket_path(home).display().to_string(),
                });
                print_json(&payload)?;
            }
            Err(err) => return Err(err).context("failed to query daemon status"),
        },
    }

    Ok(())
}

#[cfg(unix)]
fn start(session: &Session) -> Result<()> {
    siteblock_daemon::start_blocking(session.home(), session.settings().clone())
        .context("daemon exited with error")
}

#[cfg(not(unix))]
fn start(_session: &Session) -> Result<()> {
    anyhow::bail!(
        "the scheduler daemon needs Unix domain sockets; use `siteblock on` and `siteblock off` here"
    )
}
