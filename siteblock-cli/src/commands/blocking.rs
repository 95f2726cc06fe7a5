//! `siteblock on|off|toggle`: manual blocking.

use anyhow::Result;
use colored::Colorize;
use serde::Deserialize;

use siteblock_daemon::DaemonRequest;

use super::Session;

#[derive(Debug, Clone, Copy)]
pub enum Switch {
    On,
    Off,
    Toggle,
}

#[derive(Debug, Deserialize)]
struct SwitchReply {
    active: bool,
}

pub fn run(switch: Switch, session: &Session) -> Result<()> {
    let request = match switch {
        Switch::On => DaemonRequest::On,
        Switch::Off => DaemonRequest::Off,
        Switch::Toggle => DaemonRequest::Toggle,
    };
    let reply: SwitchReply = session.call_as(request)?;
    println!("Blocking is {}", state_label(reply.active));
    Ok(())
}

pub fn state_label(active: bool) -> String {
    if active {
        "ON".green().bold().to_string()
    } else {
        "OFF".bright_black().bold().to_string()
    }
}
