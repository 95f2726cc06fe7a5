//! `siteblock schedule`: time windows during which the daemon blocks.

use anyhow::Result;
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use siteblock_core::Day;
use siteblock_daemon::{DaemonRequest, ScheduleEntry};

use super::{print_json, Session};

#[derive(Subcommand, Debug)]
pub enum ScheduleCommand {
    /// Block between two times on the given days.
    Add(ScheduleAddArgs),
    /// Show every schedule with its index.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete the schedule at `index` (see `schedule list`).
    Remove { index: usize },
}

#[derive(Args, Debug)]
pub struct ScheduleAddArgs {
    /// Start time, HH:MM (24-hour).
    pub start: String,
    /// End time, HH:MM (24-hour), inclusive.
    pub end: String,
    /// Day to block on; repeat or comma-separate (`--day mon,tue`).
    #[arg(long = "day", required = true, value_delimiter = ',')]
    pub days: Vec<String>,
}

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "start")]
    start: String,
    #[tabled(rename = "end")]
    end: String,
    #[tabled(rename = "days")]
    days: String,
}

impl From<&ScheduleEntry> for ScheduleRow {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            index: entry.index,
            start: entry.start.to_string(),
            end: entry.end.to_string(),
            days: day_list(&entry.days),
        }
    }
}

pub fn run(command: ScheduleCommand, session: &Session) -> Result<()> {
    match command {
        ScheduleCommand::Add(args) => {
            let entry: ScheduleEntry = session.call_as(DaemonRequest::ScheduleAdd {
                start: args.start,
                end: args.end,
                days: args.days,
            })?;
            println!("Added schedule #{}: {}", entry.index, describe(&entry));
        }
        ScheduleCommand::List { json } => {
            let entries: Vec<ScheduleEntry> = session.call_as(DaemonRequest::ScheduleList)?;
            if json {
                return print_json(&entries);
            }
            print_table(&entries);
        }
        ScheduleCommand::Remove { index } => {
            let entry: ScheduleEntry =
                session.call_as(DaemonRequest::ScheduleRemove { index })?;
            println!("Removed schedule #{}: {}", entry.index, describe(&entry));
        }
    }
    Ok(())
}

pub fn print_table(entries: &[ScheduleEntry]) {
    if entries.is_empty() {
        println!("No schedules.");
        return;
    }
    let rows: Vec<ScheduleRow> = entries.iter().map(ScheduleRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn describe(entry: &ScheduleEntry) -> String {
    format!("{}-{} on {}", entry.start, entry.end, day_list(&entry.days))
}

fn day_list(days: &[Day]) -> String {
    if days.len() == Day::ALL.len() {
        return "every day".to_string();
    }
    days.iter()
        .map(|d| d.short_name())
        .collect::<Vec<_>>()
        .join(", ")
}
