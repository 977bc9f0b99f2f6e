//! Backup engine - runs one backup pass over all running containers

use crate::{
    core::{
        image::container_names, provider::temp_file_name, provider::ProviderError,
        BackupProvider, BackupRecord, BackupFailure, Compression, ProviderRegistry, RunReport,
        RunStatus,
    },
    docker::{Container, ContainerRuntime, DockerError},
};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Error types for backup runs
#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Docker(#[from] DockerError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Events that can occur during a backup run
#[derive(Debug, Clone)]
pub enum BackupEvent {
    RunStarted {
        run_id: Uuid,
    },
    ContainersFound {
        count: usize,
    },
    BackupStarted {
        container: String,
        provider: String,
    },
    BackupProgress {
        container: String,
        bytes: u64,
    },
    BackupCompleted {
        container: String,
        provider: String,
        path: PathBuf,
        bytes: u64,
    },
    BackupFailed {
        container: String,
        provider: String,
        error: String,
    },
    RunCompleted {
        run_id: Uuid,
        status: RunStatus,
        backed_up: usize,
        duration_secs: f64,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&BackupEvent) + Send + Sync>;

/// Where and how backups are written
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub backup_dir: PathBuf,
    pub compression: Compression,
}

impl EngineSettings {
    /// Final path of a container's backup
    pub fn backup_path(&self, container_name: &str, provider: &BackupProvider) -> PathBuf {
        self.backup_dir.join(format!(
            "{}.{}{}",
            container_name,
            provider.file_extension,
            self.compression.file_extension()
        ))
    }
}

/// A container paired with the provider that will back it up
#[derive(Debug, Clone)]
pub struct PlannedBackup<'a> {
    pub container: Container,
    pub image_names: Vec<String>,
    pub provider: Option<&'a BackupProvider>,
}

/// Main backup engine
pub struct BackupEngine<R> {
    runtime: Arc<R>,
    registry: ProviderRegistry,
    settings: EngineSettings,
    event_handlers: Vec<EventHandler>,
}

impl<R: ContainerRuntime + 'static> BackupEngine<R> {
    pub fn new(runtime: R, registry: ProviderRegistry, settings: EngineSettings) -> Self {
        Self {
            runtime: Arc::new(runtime),
            registry,
            settings,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&BackupEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    fn emit_event(&self, event: BackupEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Match every running container against the provider registry
    /// without backing anything up
    pub async fn plan(&self) -> Result<Vec<PlannedBackup<'_>>, BackupError> {
        let containers = self.runtime.list_running().await?;

        Ok(containers
            .into_iter()
            .map(|container| {
                let image_names: Vec<String> = container_names(&container).into_iter().collect();
                let provider = self.registry.find(&image_names);
                PlannedBackup {
                    container,
                    image_names,
                    provider,
                }
            })
            .collect())
    }

    /// Run a single backup pass.
    ///
    /// A failing container is recorded in the report and does not stop the
    /// pass. Only failing to reach the runtime or to create the backup
    /// directory is an error.
    pub async fn run_once(&self) -> Result<RunReport, BackupError> {
        let mut report = RunReport::start();
        debug!("Starting backup run {}", report.run_id);
        self.emit_event(BackupEvent::RunStarted {
            run_id: report.run_id,
        });

        std::fs::create_dir_all(&self.settings.backup_dir)?;

        let plan = self.plan().await?;
        report.containers_found = plan.len();
        debug!("Found {} containers", plan.len());
        self.emit_event(BackupEvent::ContainersFound { count: plan.len() });

        for planned in plan {
            let Some(provider) = planned.provider else {
                debug!(
                    "Skipping {} ({}): no backup provider",
                    planned.container.name,
                    planned.image_names.join(", ")
                );
                continue;
            };

            let container = &planned.container;
            self.emit_event(BackupEvent::BackupStarted {
                container: container.name.clone(),
                provider: provider.name.clone(),
            });

            match self.backup_container(container, provider).await {
                Ok(record) => {
                    debug!(
                        "Backed up {} ({}) to {} ({} bytes)",
                        container.name,
                        provider.name,
                        record.path.display(),
                        record.bytes
                    );
                    self.emit_event(BackupEvent::BackupCompleted {
                        container: record.container.clone(),
                        provider: record.provider.clone(),
                        path: record.path.clone(),
                        bytes: record.bytes,
                    });
                    report.backups.push(record);
                }
                Err(e) => {
                    error!("Backup of {} ({}) failed: {}", container.name, provider.name, e);
                    self.emit_event(BackupEvent::BackupFailed {
                        container: container.name.clone(),
                        provider: provider.name.clone(),
                        error: e.to_string(),
                    });
                    report.failures.push(BackupFailure {
                        container: container.name.clone(),
                        provider: provider.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.finish();
        let duration_secs = report.duration().map(|d| d.as_secs_f64()).unwrap_or_default();
        debug!(
            "Backup of {} containers complete in {:.2} seconds",
            report.backups.len(),
            duration_secs
        );
        self.emit_event(BackupEvent::RunCompleted {
            run_id: report.run_id,
            status: report.status,
            backed_up: report.backups.len(),
            duration_secs,
        });

        Ok(report)
    }

    /// Back up one container, leaving no temp file behind on failure
    async fn backup_container(
        &self,
        container: &Container,
        provider: &BackupProvider,
    ) -> Result<BackupRecord, BackupError> {
        let temp_path = self.settings.backup_dir.join(temp_file_name());
        let final_path = self.settings.backup_path(&container.name, provider);

        let result = self
            .dump_to(container, provider, &temp_path, &final_path)
            .await;

        if result.is_err() {
            if let Err(e) = std::fs::remove_file(&temp_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", temp_path.display(), e);
                }
            }
        }

        let bytes = result?;
        Ok(BackupRecord {
            container: container.name.clone(),
            provider: provider.name.clone(),
            path: final_path,
            bytes,
        })
    }

    async fn dump_to(
        &self,
        container: &Container,
        provider: &BackupProvider,
        temp_path: &Path,
        final_path: &Path,
    ) -> Result<u64, BackupError> {
        let command = provider.backup_command(self.runtime.as_ref(), container).await?;

        let mut writer = self.settings.compression.writer(create_private(temp_path)?);
        let mut written = 0u64;
        let name = container.name.clone();

        {
            let mut sink = |chunk: &[u8]| -> io::Result<()> {
                writer.write_all(chunk)?;
                written += chunk.len() as u64;
                self.emit_event(BackupEvent::BackupProgress {
                    container: name.clone(),
                    bytes: written,
                });
                Ok(())
            };
            self.runtime
                .exec_streaming(container, &command, &mut sink)
                .await?;
        }

        let file = writer.finish()?;
        file.sync_all()?;
        drop(file);

        // Atomic within the backup directory: readers never see a partial dump
        std::fs::rename(temp_path, final_path)?;
        Ok(written)
    }
}

/// Create a new file readable only by its owner, regardless of umask
fn create_private(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
