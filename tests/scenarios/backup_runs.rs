//! Test: Backup Runs - matching containers are dumped into the backup directory

use crate::helpers::*;
use db_auto_backup::core::Compression;
use db_auto_backup::execution::BackupEvent;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Test that every supported database is backed up under its own name
#[tokio::test]
async fn test_backs_up_each_provider() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new()
        .with_container("app-db-1", "postgres:16", MockContainer::with_dump(b"-- pg dump\n"))
        .with_container(
            "wiki-db",
            "mariadb:11",
            MockContainer::with_dump(b"-- mariadb dump\n").env("MARIADB_ROOT_PASSWORD", "secret"),
        )
        .with_container("cache", "redis:7-alpine", MockContainer::with_dump(b"REDIS0011"))
        .with_container("web", "nginx:latest", MockContainer::default());

    let engine = engine(runtime, dir.path(), Compression::Plain);
    let report = engine.run_once().await.unwrap();

    assert_run_completed(&report);
    assert_eq!(report.containers_found, 4);
    assert_eq!(report.backed_up(), vec!["app-db-1", "wiki-db", "cache"]);

    assert_eq!(
        dir_entries(dir.path()),
        vec!["app-db-1.sql", "cache.rdb", "wiki-db.sql"]
    );
    let path = assert_backed_up(&report, "cache");
    assert_eq!(std::fs::read(path).unwrap(), b"REDIS0011");
}

/// Test the dump command chosen for each provider
#[tokio::test]
async fn test_dump_commands() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new()
        .with_container(
            "pg",
            "timescale/timescaledb:latest-pg16",
            MockContainer::with_dump(b"x").env("POSTGRES_USER", "app"),
        )
        .with_container(
            "legacy-mysql",
            "mysql:5.7",
            MockContainer::with_dump(b"x").env("MYSQL_ROOT_PASSWORD", "hunter2"),
        )
        .with_container(
            "maria",
            "lscr.io/linuxserver/mariadb:latest",
            MockContainer::with_dump(b"x")
                .env("MYSQL_ROOT_PASSWORD", "pw")
                .binary("mariadb-dump"),
        );

    let engine = engine(runtime, dir.path(), Compression::Plain);
    let report = engine.run_once().await.unwrap();
    assert_run_completed(&report);

    let commands: HashMap<String, Vec<String>> =
        engine.runtime().dump_commands().into_iter().collect();
    assert_eq!(commands["pg"], vec!["pg_dumpall", "-U", "app"]);
    assert_eq!(
        commands["legacy-mysql"],
        vec!["mysqldump", "-phunter2", "--all-databases"]
    );
    assert_eq!(commands["maria"], vec!["mariadb-dump", "-ppw", "--all-databases"]);
}

/// Test that postgres falls back to the default superuser
#[tokio::test]
async fn test_postgres_default_user() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new().with_container(
        "nextcloud-aio-database",
        "nextcloud/aio-postgresql:latest",
        MockContainer::with_dump(b"x"),
    );

    let engine = engine(runtime, dir.path(), Compression::Plain);
    engine.run_once().await.unwrap();

    let commands = engine.runtime().dump_commands();
    assert_eq!(commands[0].1, vec!["pg_dumpall", "-U", "postgres"]);
}

/// Test that redis snapshots go through a uniquely named temp file
#[tokio::test]
async fn test_redis_command_uses_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let runtime =
        MockRuntime::new().with_container("cache", "redis", MockContainer::with_dump(b"REDIS"));

    let engine = engine(runtime, dir.path(), Compression::Plain);
    engine.run_once().await.unwrap();

    let commands = engine.runtime().dump_commands();
    let argv = &commands[0].1;
    assert_eq!(argv[..2], ["sh".to_string(), "-c".to_string()]);
    assert!(argv[2].starts_with("redis-cli --rdb /tmp/.auto-backup-"));
    assert!(argv[2].contains("> /dev/null && cat /tmp/.auto-backup-"));
}

/// Test that backup files are private to their owner
#[cfg(unix)]
#[tokio::test]
async fn test_backup_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let runtime =
        MockRuntime::new().with_container("db", "postgres", MockContainer::with_dump(b"data"));

    let report = engine(runtime, dir.path(), Compression::Plain)
        .run_once()
        .await
        .unwrap();

    let path = assert_backed_up(&report, "db");
    let mode = std::fs::metadata(path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

/// Test that a second run replaces the previous backup
#[tokio::test]
async fn test_rerun_overwrites_backup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("db.sql"), b"stale").unwrap();

    let runtime =
        MockRuntime::new().with_container("db", "postgres", MockContainer::with_dump(b"fresh"));
    let report = engine(runtime, dir.path(), Compression::Plain)
        .run_once()
        .await
        .unwrap();

    assert_run_completed(&report);
    assert_eq!(std::fs::read(dir.path().join("db.sql")).unwrap(), b"fresh");
    assert_no_temp_files(dir.path());
}

/// Test that the backup directory is created on demand
#[tokio::test]
async fn test_creates_backup_dir() {
    let dir = tempfile::tempdir().unwrap();
    let backup_dir = dir.path().join("nested").join("backups");

    let runtime =
        MockRuntime::new().with_container("db", "postgres", MockContainer::with_dump(b"x"));
    let report = engine(runtime, &backup_dir, Compression::Plain)
        .run_once()
        .await
        .unwrap();

    assert_run_completed(&report);
    assert!(backup_dir.join("db.sql").exists());
}

/// Test that a host with no databases is a clean, empty run
#[tokio::test]
async fn test_no_matching_containers() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new().with_container("web", "nginx", MockContainer::default());

    let report = engine(runtime, dir.path(), Compression::Plain)
        .run_once()
        .await
        .unwrap();

    assert_run_completed(&report);
    assert_eq!(report.containers_found, 1);
    assert!(report.backups.is_empty());
    assert!(dir_entries(dir.path()).is_empty());
}

/// Test the events emitted over a run
#[tokio::test]
async fn test_event_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new().with_container(
        "db",
        "postgres",
        MockContainer::with_dump(b"0123456789"),
    );

    let mut engine = engine(runtime, dir.path(), Compression::Plain);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event.clone()));

    engine.run_once().await.unwrap();

    let events = events.lock().unwrap();
    assert!(matches!(events[0], BackupEvent::RunStarted { .. }));
    assert!(matches!(events[1], BackupEvent::ContainersFound { count: 1 }));
    assert!(matches!(events[2], BackupEvent::BackupStarted { .. }));

    let progress: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            BackupEvent::BackupProgress { bytes, .. } => Some(*bytes),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![5, 10]);

    assert!(matches!(
        events[events.len() - 2],
        BackupEvent::BackupCompleted { bytes: 10, .. }
    ));
    assert!(matches!(
        events[events.len() - 1],
        BackupEvent::RunCompleted { backed_up: 1, .. }
    ));
}

/// Test the dry-run plan
#[tokio::test]
async fn test_plan_matches_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = MockRuntime::new()
        .with_container("db", "docker.io/library/postgres:16", MockContainer::default())
        .with_container("web", "nginx", MockContainer::default());

    let engine = engine(runtime, dir.path(), Compression::Gzip);
    let plan = engine.plan().await.unwrap();

    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].provider.map(|p| p.name.as_str()), Some("postgres"));
    assert!(plan[0].image_names.contains(&"postgres".to_string()));
    assert!(plan[1].provider.is_none());
    assert!(engine.runtime().dump_commands().is_empty());
    assert!(dir_entries(dir.path()).is_empty());
}
