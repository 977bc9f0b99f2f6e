//! db-auto-backup - automatic database backups for Docker hosts

pub mod cli;
pub mod core;
pub mod docker;
pub mod execution;
pub mod persistence;

// Re-export commonly used types
pub use core::{BackupConfig, Compression, CronSchedule, ProviderRegistry, RunReport, RunStatus};
pub use docker::{Container, ContainerRuntime, DockerCli, DockerError, ExecOutput};
pub use execution::{
    BackupEngine, BackupError, BackupEvent, EngineSettings, RunFinisher, SuccessHook,
};
