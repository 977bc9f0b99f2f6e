//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, ListCommand, RunCommand, ScheduleCommand};
use std::ffi::OsString;

/// Automatic database backups for Docker hosts
///
/// Configuration comes from the environment: BACKUP_DIR, SCHEDULE,
/// COMPRESSION, SUCCESS_HOOK_URL, HEALTHCHECKS_ID, UPTIME_KUMA_URL,
/// INCLUDE_LOGS and CUSTOM_BACKUP_PROVIDER_<NAME>_PATTERNS.
#[derive(Debug, Parser, Clone)]
#[command(name = "db-auto-backup")]
#[command(version)]
#[command(about = "Automatic database backups for Docker hosts")]
pub struct Cli {
    /// Without a subcommand, behaves like `run`
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Back up now, or on SCHEDULE if it is set
    Run(RunCommand),

    /// Show which running containers would be backed up
    List(ListCommand),

    /// Show past backup runs
    History(HistoryCommand),

    /// Validate SCHEDULE and show when it fires next
    Schedule(ScheduleCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// The command to run, defaulting to `run`
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Run(RunCommand::default()))
    }
}
