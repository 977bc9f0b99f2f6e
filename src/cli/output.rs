//! CLI output formatting

use crate::{
    core::RunStatus,
    execution::{BackupEvent, PlannedBackup},
    persistence::RunSummary,
};
use console::{Emoji, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static DISK: Emoji<'_, '_> = Emoji("💾 ", "> ");

/// Create a byte-counting spinner for one container
pub fn create_progress_spinner(message: String) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg} {bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    indicatif::HumanBytes(bytes).to_string()
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Format a history entry for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        RunStatus::Completed => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Running => SPINNER,
    };

    let mut line = format!(
        "{} {} - {} - {} - {} backed up ({})",
        status_icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")).bold(),
        format_status(summary.status),
        style(summary.backed_up.len()).cyan(),
        format_bytes(summary.total_bytes),
    );
    if !summary.failed.is_empty() {
        line.push_str(&format!(
            ", {} failed: {}",
            style(summary.failed.len()).red(),
            summary.failed.join(", ")
        ));
    }
    line
}

/// Format a dry-run plan entry
pub fn format_planned(planned: &PlannedBackup<'_>, target: Option<String>) -> String {
    match (planned.provider, target) {
        (Some(provider), Some(target)) => format!(
            "{} {} ({}) → {}",
            DISK,
            style(&planned.container.name).bold(),
            style(&provider.name).cyan(),
            style(target).dim()
        ),
        _ => format!(
            "{} {} ({})",
            INFO,
            style(&planned.container.name).dim(),
            style(planned.image_names.join(", ")).dim()
        ),
    }
}

/// Format a backup event as a single line (non-interactive output)
pub fn format_backup_event(event: &BackupEvent) -> Option<String> {
    match event {
        BackupEvent::RunStarted { .. } => Some(format!("{} Starting backup...", INFO)),
        BackupEvent::ContainersFound { count } => {
            Some(format!("{} Found {} containers.", INFO, style(count).cyan()))
        }
        BackupEvent::BackupCompleted {
            container,
            provider,
            bytes,
            ..
        } => Some(format!(
            "{} {} ({}) {}",
            CHECK,
            style(container).green(),
            provider,
            style(format_bytes(*bytes)).dim()
        )),
        BackupEvent::BackupFailed {
            container,
            provider,
            error,
        } => Some(format!(
            "{} {} ({}): {}",
            CROSS,
            style(container).red(),
            provider,
            style(error).dim()
        )),
        BackupEvent::RunCompleted {
            status,
            backed_up,
            duration_secs,
            ..
        } => {
            let icon = if *status == RunStatus::Completed { CHECK } else { WARN };
            Some(format!(
                "{} Backup of {} containers complete in {:.2} seconds.",
                icon, backed_up, duration_secs
            ))
        }
        BackupEvent::BackupStarted { .. } | BackupEvent::BackupProgress { .. } => None,
    }
}

/// Renders backup events to the terminal.
///
/// On an interactive terminal each container gets a live byte counter;
/// otherwise one line is printed per finished container.
pub struct ConsoleReporter {
    interactive: bool,
    current: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::with_interactive(Term::stdout().is_term())
    }

    pub fn with_interactive(interactive: bool) -> Self {
        Self {
            interactive,
            current: Mutex::new(None),
        }
    }

    pub fn handle(&self, event: &BackupEvent) {
        if self.interactive {
            let mut current = match self.current.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match event {
                BackupEvent::BackupStarted { container, provider } => {
                    let message = format!("{} ({})", container, provider);
                    *current = Some(create_progress_spinner(message));
                    return;
                }
                BackupEvent::BackupProgress { bytes, .. } => {
                    if let Some(progress) = current.as_ref() {
                        progress.set_position(*bytes);
                    }
                    return;
                }
                BackupEvent::BackupCompleted { .. } | BackupEvent::BackupFailed { .. } => {
                    if let Some(progress) = current.take() {
                        progress.finish_and_clear();
                    }
                }
                _ => {}
            }
        }

        if let Some(line) = format_backup_event(event) {
            println!("{}", line);
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}
