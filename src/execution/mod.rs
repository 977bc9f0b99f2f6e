//! Backup execution

pub mod engine;
pub mod hook;
pub mod scheduler;

pub use engine::{BackupEngine, BackupError, BackupEvent, EngineSettings, PlannedBackup};
pub use hook::{HookError, SuccessHook};
pub use scheduler::{
    run_scheduled, run_scheduled_with_clock, run_single, shutdown_signal, RunFinisher,
};
