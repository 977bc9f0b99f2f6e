//! Test: Failure Handling - one broken container never stops the run

use crate::helpers::*;
use db_auto_backup::core::{Compression, RunStatus};
use db_auto_backup::execution::BackupError;

/// Test that a MySQL container without a root password fails alone
#[tokio::test]
async fn test_missing_mysql_password() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new()
        .with_container("mysql", "mysql:8", MockContainer::with_dump(b"x"))
        .with_container("pg", "postgres", MockContainer::with_dump(b"y"));

    let engine = engine(runtime, dir.path(), Compression::Plain);
    let report = engine.run_once().await.unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_failed(&report, "mysql", "Unable to find MySQL root password");
    assert_backed_up(&report, "pg");

    // The dump was never started
    let commands = engine.runtime().dump_commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].0, "pg");
    assert_eq!(dir_entries(dir.path()), vec!["pg.sql"]);
}

/// Test that an empty password counts as missing
#[tokio::test]
async fn test_empty_mysql_password() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new().with_container(
        "maria",
        "mariadb",
        MockContainer::with_dump(b"x")
            .env("MYSQL_ROOT_PASSWORD", "")
            .env("MARIADB_ROOT_PASSWORD", "fallback"),
    );

    let engine = engine(runtime, dir.path(), Compression::Plain);
    let report = engine.run_once().await.unwrap();

    assert_run_completed(&report);
    assert_eq!(
        engine.runtime().dump_commands()[0].1,
        vec!["mysqldump", "-pfallback", "--all-databases"]
    );
}

/// Test that a dump exiting non-zero leaves neither a backup nor a temp file
#[tokio::test]
async fn test_failed_dump_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new()
        .with_container(
            "broken",
            "postgres",
            MockContainer::with_dump(b"partial output").exit_code(1),
        )
        .with_container("cache", "redis", MockContainer::with_dump(b"REDIS"));

    let report = engine(runtime, dir.path(), Compression::Gzip)
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_failed(&report, "broken", "exited with code 1");
    assert_backed_up(&report, "cache");
    assert_no_temp_files(dir.path());
    assert_eq!(dir_entries(dir.path()), vec!["cache.rdb.gz"]);
}

/// Test that a failed dump keeps the previous good backup
#[tokio::test]
async fn test_failed_dump_keeps_previous_backup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("db.sql"), b"yesterday").unwrap();

    let runtime = MockRuntime::new().with_container(
        "db",
        "postgres",
        MockContainer::with_dump(b"half").exit_code(137),
    );
    let report = engine(runtime, dir.path(), Compression::Plain)
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(std::fs::read(dir.path().join("db.sql")).unwrap(), b"yesterday");
    assert_no_temp_files(dir.path());
}

/// Test that an unreachable daemon fails the whole run
#[tokio::test]
async fn test_unreachable_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let result = engine(MockRuntime::unreachable(), dir.path(), Compression::Plain)
        .run_once()
        .await;

    match result {
        Err(BackupError::Docker(e)) => assert!(e.to_string().contains("Docker daemon")),
        other => panic!("expected docker error, got {:?}", other.map(|r| r.status)),
    }
}

/// Test that a root password with shell and dotenv metacharacters is passed verbatim
#[tokio::test]
async fn test_mysql_password_is_literal() {
    let dir = tempfile::tempdir().unwrap();
    let password = "pa$word it's #1 \"x\"";
    let runtime = MockRuntime::new().with_container(
        "mysql",
        "mysql:8",
        MockContainer::with_dump(b"x").env("MYSQL_ROOT_PASSWORD", password),
    );

    let engine = engine(runtime, dir.path(), Compression::Plain);
    let report = engine.run_once().await.unwrap();

    assert_run_completed(&report);
    assert_eq!(
        engine.runtime().dump_commands()[0].1,
        vec![
            "mysqldump".to_string(),
            format!("-p{}", password),
            "--all-databases".to_string()
        ]
    );
}
