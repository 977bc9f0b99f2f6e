//! Test: Scheduling - the cron loop skips missed fires and survives failed passes

use crate::helpers::*;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use db_auto_backup::core::{Compression, CronSchedule};
use db_auto_backup::execution::{run_scheduled_with_clock, BackupEngine, BackupEvent, RunFinisher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A wall clock that starts at `start` and follows tokio's (paused) time
fn test_clock(start: DateTime<Local>) -> impl Fn() -> DateTime<Local> + Clone {
    let origin = tokio::time::Instant::now();
    move || start + chrono::Duration::from_std(origin.elapsed()).unwrap()
}

fn local(h: u32, m: u32, s: u32) -> DateTime<Local> {
    let naive = NaiveDate::from_ymd_opt(2024, 1, 10)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap();
    Local.from_local_datetime(&naive).single().unwrap()
}

/// Record the (test clock) minute at which every pass started
fn record_pass_starts<R>(
    engine: &mut BackupEngine<R>,
    clock: impl Fn() -> DateTime<Local> + Send + Sync + 'static,
) -> Arc<Mutex<Vec<String>>>
where
    R: db_auto_backup::ContainerRuntime + 'static,
{
    let starts = Arc::new(Mutex::new(Vec::new()));
    let sink = starts.clone();
    engine.add_event_handler(move |event| {
        if let BackupEvent::RunStarted { .. } = event {
            sink.lock().unwrap().push(clock().format("%H:%M").to_string());
        }
    });
    starts
}

/// Test that fire times passed during a slow pass are skipped, not queued
#[tokio::test(start_paused = true)]
async fn test_missed_fires_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new().with_container(
        "db",
        "postgres",
        MockContainer::with_dump(b"dump").delay(Duration::from_secs(150)),
    );
    let mut engine = engine(runtime, dir.path(), Compression::Plain);

    let clock = test_clock(local(10, 0, 30));
    let starts = record_pass_starts(&mut engine, clock.clone());
    let schedule = CronSchedule::parse("* * * * *").unwrap();

    // Passes start 10:01, 10:04, 10:07; each runs 2.5 minutes
    let shutdown = tokio::time::sleep(Duration::from_secs(7 * 60));
    run_scheduled_with_clock(&engine, &schedule, &RunFinisher::default(), shutdown, clock).await;

    assert_eq!(*starts.lock().unwrap(), vec!["10:01", "10:04", "10:07"]);
}

/// Test that a pass failing to reach Docker doesn't stop the loop
#[tokio::test(start_paused = true)]
async fn test_failed_pass_keeps_looping() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine(MockRuntime::unreachable(), dir.path(), Compression::Plain);

    let clock = test_clock(local(10, 0, 30));
    let starts = record_pass_starts(&mut engine, clock.clone());
    let schedule = CronSchedule::parse("* * * * *").unwrap();

    let shutdown = tokio::time::sleep(Duration::from_secs(180));
    run_scheduled_with_clock(&engine, &schedule, &RunFinisher::default(), shutdown, clock).await;

    assert_eq!(*starts.lock().unwrap(), vec!["10:01", "10:02", "10:03"]);
}

/// Test that each pass writes the backup again
#[tokio::test(start_paused = true)]
async fn test_each_fire_runs_a_pass() {
    let dir = tempfile::tempdir().unwrap();
    let runtime =
        MockRuntime::new().with_container("db", "postgres", MockContainer::with_dump(b"dump"));
    let mut engine = engine(runtime, dir.path(), Compression::Plain);

    let clock = test_clock(local(23, 44, 0));
    let starts = record_pass_starts(&mut engine, clock.clone());
    let schedule = CronSchedule::parse("*/15 * * * *").unwrap();

    let shutdown = tokio::time::sleep(Duration::from_secs(40 * 60));
    run_scheduled_with_clock(&engine, &schedule, &RunFinisher::default(), shutdown, clock).await;

    assert_eq!(*starts.lock().unwrap(), vec!["23:45", "00:00", "00:15"]);
    assert_eq!(engine.runtime().dump_commands().len(), 3);
    assert_no_temp_files(dir.path());
}

/// Test that shutdown before the first fire time runs nothing
#[tokio::test(start_paused = true)]
async fn test_shutdown_before_first_fire() {
    let dir = tempfile::tempdir().unwrap();
    let runtime =
        MockRuntime::new().with_container("db", "postgres", MockContainer::with_dump(b"dump"));
    let engine = engine(runtime, dir.path(), Compression::Plain);

    let schedule = CronSchedule::parse("0 3 * * *").unwrap();
    let shutdown = tokio::time::sleep(Duration::from_secs(60));
    let clock = test_clock(local(10, 0, 0));
    run_scheduled_with_clock(&engine, &schedule, &RunFinisher::default(), shutdown, clock).await;

    assert!(engine.runtime().dump_commands().is_empty());
}

/// Test that a schedule that never fires returns instead of waiting forever
#[tokio::test(start_paused = true)]
async fn test_never_firing_schedule_returns() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(MockRuntime::new(), dir.path(), Compression::Plain);

    let schedule = CronSchedule::parse("0 0 31 2 *").unwrap();
    let finisher = RunFinisher::default();
    let run = run_scheduled_with_clock(
        &engine,
        &schedule,
        &finisher,
        std::future::pending::<()>(),
        test_clock(local(10, 0, 0)),
    );

    tokio::time::timeout(Duration::from_secs(1), run)
        .await
        .expect("loop should stop on its own");
}
