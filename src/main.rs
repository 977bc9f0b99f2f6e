use anyhow::{Context, Result};
use chrono::Local;
use db_auto_backup::cli::commands::{HistoryCommand, ListCommand, RunCommand, ScheduleCommand};
use db_auto_backup::cli::output::*;
use db_auto_backup::cli::{Cli, Command};
use db_auto_backup::core::{BackupConfig, ProviderRegistry};
use db_auto_backup::docker::DockerCli;
use db_auto_backup::execution::{
    run_scheduled, run_single, shutdown_signal, BackupEngine, EngineSettings, RunFinisher,
    SuccessHook,
};
use db_auto_backup::persistence::PersistenceBackend;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Timeout for docker inspect/env/which calls
const DOCKER_TIMEOUT_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG overrides --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let config = BackupConfig::from_env().context("Invalid configuration")?;

    match cli.command() {
        Command::Run(cmd) => run_backups(&cmd, &config).await?,
        Command::List(cmd) => list_containers(&cmd, &config).await?,
        Command::History(cmd) => show_history(&cmd, &config).await?,
        Command::Schedule(cmd) => show_schedule(&cmd, &config)?,
    }

    Ok(())
}

fn create_engine(config: &BackupConfig) -> Result<BackupEngine<DockerCli>> {
    let registry = ProviderRegistry::with_custom_patterns(&config.custom_patterns)?;
    let runtime = DockerCli::new(config.docker_path.clone(), DOCKER_TIMEOUT_SECS);
    let settings = EngineSettings {
        backup_dir: config.backup_dir.clone(),
        compression: config.compression,
    };
    Ok(BackupEngine::new(runtime, registry, settings))
}

#[cfg(feature = "sqlite")]
async fn open_history(config: &BackupConfig) -> Result<Arc<dyn PersistenceBackend>> {
    let store =
        db_auto_backup::persistence::SqliteRunStore::open(config.history_db.as_deref()).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_history(_config: &BackupConfig) -> Result<Arc<dyn PersistenceBackend>> {
    anyhow::bail!("History requires the `sqlite` feature")
}

async fn run_backups(cmd: &RunCommand, config: &BackupConfig) -> Result<()> {
    let mut engine = create_engine(config)?;
    let reporter = ConsoleReporter::new();
    engine.add_event_handler(move |event| reporter.handle(event));

    let hook = config.hook.clone().map(SuccessHook::new).transpose()?;

    // History is best-effort: a read-only data dir must not stop backups
    let history = if cmd.no_history {
        None
    } else {
        match open_history(config).await {
            Ok(store) => Some(store),
            Err(e) => {
                warn!("Run history disabled: {:#}", e);
                None
            }
        }
    };
    let finisher = RunFinisher::new(hook, history);

    match &config.schedule {
        Some(schedule) if !cmd.once => {
            run_scheduled(&engine, schedule, &finisher, shutdown_signal()).await;
        }
        _ => {
            let report = run_single(&engine, &finisher).await?;
            if !report.is_success() {
                println!(
                    "\n{} {} of {} backups {}",
                    CROSS,
                    report.failures.len(),
                    report.failures.len() + report.backups.len(),
                    style("failed").red()
                );
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn list_containers(cmd: &ListCommand, config: &BackupConfig) -> Result<()> {
    let engine = create_engine(config)?;
    let plan = engine.plan().await.context("Failed to list containers")?;

    if cmd.json {
        let entries: Vec<_> = plan
            .iter()
            .filter(|p| cmd.all || p.provider.is_some())
            .map(|p| {
                serde_json::json!({
                    "container": p.container.name,
                    "id": p.container.id,
                    "images": p.image_names,
                    "provider": p.provider.map(|provider| provider.name.clone()),
                    "target": p.provider.map(|provider| {
                        engine.settings().backup_path(&p.container.name, provider)
                    }),
                })
            })
            .collect();
        let data = serde_json::json!({ "containers": entries });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    let matched = plan.iter().filter(|p| p.provider.is_some()).count();
    println!(
        "{} {} running containers, {} to back up into {}",
        INFO,
        style(plan.len()).cyan(),
        style(matched).green(),
        style(config.backup_dir.display()).bold()
    );

    for planned in &plan {
        if planned.provider.is_none() && !cmd.all {
            continue;
        }
        let target = planned.provider.map(|provider| {
            engine
                .settings()
                .backup_path(&planned.container.name, provider)
                .display()
                .to_string()
        });
        println!("  {}", format_planned(planned, target));
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand, config: &BackupConfig) -> Result<()> {
    let store = open_history(config).await?;

    // If specific run ID is requested
    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(summary) => {
                if cmd.json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    println!("{} Run Details", INFO);
                    println!("  ID: {}", style(summary.run_id).cyan());
                    println!("  Status: {}", format_status(summary.status));
                    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
                    if let Some(completed) = summary.completed_at {
                        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
                        let elapsed = completed.signed_duration_since(summary.started_at);
                        if let Ok(duration) = elapsed.to_std() {
                            println!("  Duration: {}", style(format_duration(duration)).dim());
                        }
                    }
                    println!("  Size: {}", format_bytes(summary.total_bytes));
                    println!("  Backed up: {}", summary.backed_up.join(", "));
                    if !summary.failed.is_empty() {
                        println!("  Failed: {}", style(summary.failed.join(", ")).red());
                    }
                }
            }
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let runs = store.list_runs(cmd.limit).await?;

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("{} No backup runs recorded", INFO);
        return Ok(());
    }

    println!("{} Backup history (showing latest {}):", INFO, cmd.limit);
    for summary in &runs {
        println!("  {}", format_run_summary(summary));
    }

    Ok(())
}

fn show_schedule(cmd: &ScheduleCommand, config: &BackupConfig) -> Result<()> {
    let Some(schedule) = &config.schedule else {
        println!("{} SCHEDULE is not set; backups run once and exit", INFO);
        return Ok(());
    };

    println!("{} Schedule '{}' is valid", CHECK, style(schedule).cyan());

    let upcoming = schedule.upcoming(Local::now().naive_local(), cmd.count);
    if upcoming.is_empty() {
        println!("{} Schedule never fires", WARN);
        return Ok(());
    }
    for at in upcoming {
        println!("  {}", style(at.format("%a %Y-%m-%d %H:%M")).dim());
    }

    Ok(())
}
