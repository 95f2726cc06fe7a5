//! siteblock: block distracting websites through the hosts file.
//!
//! # Usage
//!
//! ```text
//! siteblock add <site>              siteblock remove <site>
//! siteblock list [--json]           siteblock clear
//! siteblock schedule add <start> <end> --day <day>...
//! siteblock schedule list [--json]  siteblock schedule remove <index>
//! siteblock on | off | toggle       siteblock status [--json]
//! siteblock diff                    siteblock backup | restore
//! siteblock export <path>           siteblock import <path>
//! siteblock daemon start|stop|status
//! ```
//!
//! Commands go to the running daemon when there is one, otherwise they run
//! in this process against the same state file.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    blocking::Switch,
    daemon::DaemonCommand,
    schedule::ScheduleCommand,
    sites::{AddArgs, ListArgs, RemoveArgs},
    snapshot::{ExportArgs, ImportArgs},
    status::StatusArgs,
    Session,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "siteblock",
    version,
    about = "Block websites through the hosts file, on demand or on a schedule",
    long_about = None,
)]
struct Cli {
    /// Hosts file to edit instead of the system one (env: SITEBLOCK_HOSTS_FILE).
    #[arg(long, global = true, value_name = "PATH")]
    hosts_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a site to the block list.
    Add(AddArgs),

    /// Remove a site from the block list.
    Remove(RemoveArgs),

    /// Show the block list.
    List(ListArgs),

    /// Remove every site from the block list.
    Clear,

    /// Manage blocking schedules.
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },

    /// Start blocking now.
    On,

    /// Stop blocking now.
    Off,

    /// Switch blocking on or off.
    Toggle,

    /// Show blocking state, sites and schedules.
    Status(StatusArgs),

    /// Show the hosts-file change blocking would make.
    Diff,

    /// Copy the hosts file to ~/.siteblock/hosts.backup.
    Backup,

    /// Overwrite the hosts file with the backup.
    Restore,

    /// Write sites and schedules to a file.
    Export(ExportArgs),

    /// Replace sites and schedules with those from a file.
    Import(ImportArgs),

    /// Run or control the background scheduler.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let session = Session::new(cli.hosts_file)?;

    if !matches!(cli.command, Commands::Daemon { .. }) {
        siteblock_daemon::init_tracing("warn");
    }

    match cli.command {
        Commands::Add(args) => args.run(&session),
        Commands::Remove(args) => args.run(&session),
        Commands::List(args) => args.run(&session),
        Commands::Clear => commands::sites::clear(&session),
        Commands::Schedule { command } => commands::schedule::run(command, &session),
        Commands::On => commands::blocking::run(Switch::On, &session),
        Commands::Off => commands::blocking::run(Switch::Off, &session),
        Commands::Toggle => commands::blocking::run(Switch::Toggle, &session),
        Commands::Status(args) => args.run(&session),
        Commands::Diff => commands::diff::run(&session),
        Commands::Backup => commands::backup::backup(&session),
        Commands::Restore => commands::backup::restore(&session),
        Commands::Export(args) => args.run(&session),
        Commands::Import(args) => args.run(&session),
        Commands::Daemon { command } => commands::daemon::run(command, session),
    }
}
