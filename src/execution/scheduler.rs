//! Scheduled execution - runs backup passes on a cron schedule

use crate::{
    core::{CronSchedule, RunReport},
    docker::ContainerRuntime,
    execution::{BackupEngine, BackupError, SuccessHook},
    persistence::{summarize, PersistenceBackend},
};
use chrono::{DateTime, Local, TimeZone};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Post-run bookkeeping: history and the success hook
#[derive(Default)]
pub struct RunFinisher {
    hook: Option<SuccessHook>,
    history: Option<Arc<dyn PersistenceBackend>>,
}

impl RunFinisher {
    pub fn new(hook: Option<SuccessHook>, history: Option<Arc<dyn PersistenceBackend>>) -> Self {
        Self { hook, history }
    }

    /// Record the run and, if it was clean, fire the success hook.
    ///
    /// Neither failure affects the backups already written, so both are
    /// logged rather than returned.
    pub async fn finish(&self, report: &RunReport) {
        if let Some(history) = &self.history {
            if let Err(e) = history.save_run(&summarize(report)).await {
                warn!("Failed to record run {} in history: {:#}", report.run_id, e);
            }
        }

        if !report.is_success() {
            warn!(
                "{} of {} backups failed, not calling success hook",
                report.failures.len(),
                report.failures.len() + report.backups.len()
            );
            return;
        }

        if let Some(hook) = &self.hook {
            if let Err(e) = hook.notify(report).await {
                error!("{}", e);
            }
        }
    }
}

/// Run one pass and finish it
pub async fn run_single<R: ContainerRuntime + 'static>(
    engine: &BackupEngine<R>,
    finisher: &RunFinisher,
) -> Result<RunReport, BackupError> {
    let report = engine.run_once().await?;
    finisher.finish(&report).await;
    Ok(report)
}

/// Run passes on `schedule` until `shutdown` resolves.
///
/// Fire times missed while a pass was running are skipped, not queued. A
/// pass that cannot reach Docker is logged and the loop carries on.
pub async fn run_scheduled<R, F>(
    engine: &BackupEngine<R>,
    schedule: &CronSchedule,
    finisher: &RunFinisher,
    shutdown: F,
) where
    R: ContainerRuntime + 'static,
    F: Future<Output = ()>,
{
    run_scheduled_with_clock(engine, schedule, finisher, shutdown, Local::now).await
}

/// [`run_scheduled`] reading the wall clock from `clock`
pub async fn run_scheduled_with_clock<R, F, C>(
    engine: &BackupEngine<R>,
    schedule: &CronSchedule,
    finisher: &RunFinisher,
    shutdown: F,
    clock: C,
) where
    R: ContainerRuntime + 'static,
    F: Future<Output = ()>,
    C: Fn() -> DateTime<Local>,
{
    info!("Running backup with schedule '{}'", schedule);
    tokio::pin!(shutdown);

    let mut cursor = clock().naive_local();
    loop {
        let Some(next) = schedule.next_after(cursor) else {
            warn!("Schedule '{}' never fires, stopping", schedule);
            return;
        };
        cursor = next;

        // Local times inside a DST gap don't exist
        let Some(fire_at) = Local.from_local_datetime(&next).earliest() else {
            debug!("Skipping non-existent local time {}", next);
            continue;
        };

        let wait = (fire_at - clock()).to_std().unwrap_or(Duration::ZERO);
        info!("Next backup at {}", fire_at.format("%Y-%m-%d %H:%M %Z"));

        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match run_single(engine, finisher).await {
            Ok(report) => debug!("Run {} finished with {:?}", report.run_id, report.status),
            Err(e) => error!("Backup run failed: {}", e),
        }

        cursor = cursor.max(clock().naive_local());
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix (what `docker stop` sends)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
