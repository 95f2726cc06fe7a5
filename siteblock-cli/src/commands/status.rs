//! `siteblock status`: what is blocked, when, and whether it is enforced.

use anyhow::Result;
use chrono::{Datelike, Local};
use clap::Args;
use colored::Colorize;

use siteblock_core::Day;
use siteblock_daemon::{ActivationSource, DaemonRequest, Status};

use super::blocking::state_label;
use super::{plural, print_json, schedule, Session};

/// Arguments for `siteblock status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let status: Status = session.call_as(DaemonRequest::Status)?;
        if self.json {
            return print_json(&status);
        }
        print_report(&status);
        Ok(())
    }
}

fn print_report(status: &Status) {
    let source = match status.source {
        Some(ActivationSource::Manual) => " (manual)",
        Some(ActivationSource::Schedule) => " (schedule)",
        None => "",
    };
    println!(
        "siteblock v{} | blocking {}{} | {} | {}",
        env!("CARGO_PKG_VERSION"),
        state_label(status.active),
        source,
        plural(status.domains.len(), "site"),
        plural(status.schedules.len(), "schedule"),
    );

    let now = Local::now();
    println!(
        "Now: {} {}",
        Day::from(now.weekday()).name(),
        now.format("%H:%M")
    );

    match &status.daemon {
        Some(daemon) => println!(
            "Daemon: {} (pid {}, tick every {}s)",
            "running".green(),
            daemon.pid,
            daemon.tick_secs
        ),
        None => println!(
            "Daemon: {} (schedules are not enforced)",
            "not running".yellow()
        ),
    }

    let block = match status.managed_block_present {
        Some(true) => "managed block present".to_string(),
        Some(false) => "no managed block".to_string(),
        None => "unreadable".red().to_string(),
    };
    println!("Hosts file: {} ({block})", status.hosts_file.display());
    if !status.elevated {
        println!(
            "{}",
            "Not running as administrator/root: blocking will fail to write the hosts file."
                .yellow()
        );
    }

    println!();
    println!("{}", "SITES".bold());
    if status.domains.is_empty() {
        println!("No sites blocked.");
    } else {
        for domain in &status.domains {
            println!("  {domain}");
        }
    }

    println!();
    println!("{}", "SCHEDULES".bold());
    schedule::print_table(&status.schedules);
}
