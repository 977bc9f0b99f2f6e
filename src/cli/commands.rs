//! CLI command definitions

use clap::builder::RangedU64ValueParser;
use clap::Args;

/// Upper bound for `schedule --count`
pub const MAX_SCHEDULE_COUNT: u64 = 1000;

/// Back up now, or on SCHEDULE if it is set
#[derive(Debug, Args, Clone, Default)]
pub struct RunCommand {
    /// Run a single pass even if SCHEDULE is set
    #[arg(long)]
    pub once: bool,

    /// Don't record runs in history
    #[arg(long)]
    pub no_history: bool,
}

/// Show which running containers would be backed up
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Include containers without a matching provider
    #[arg(short, long)]
    pub all: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show past backup runs
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show a single run in detail
    #[arg(long)]
    pub run_id: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate SCHEDULE and show when it fires next
#[derive(Debug, Args, Clone)]
pub struct ScheduleCommand {
    /// Number of upcoming runs to show (1-1000)
    #[arg(
        short = 'n',
        long,
        default_value_t = 5,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_SCHEDULE_COUNT)
    )]
    pub count: usize,
}
