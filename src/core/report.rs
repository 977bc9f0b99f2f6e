//! Outcome of a backup run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is in progress
    Running,
    /// Every matched container was backed up
    Completed,
    /// At least one matched container failed
    Failed,
}

/// A container that was backed up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub container: String,
    pub provider: String,
    pub path: PathBuf,
    /// Uncompressed bytes received from the dump command
    pub bytes: u64,
}

/// A container whose backup failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFailure {
    pub container: String,
    pub provider: String,
    pub error: String,
}

/// Report for a single backup pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Running containers seen
    pub containers_found: usize,

    /// Successful backups, in the order they were taken
    pub backups: Vec<BackupRecord>,

    pub failures: Vec<BackupFailure>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            containers_found: 0,
            backups: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Mark the run finished and settle its status
    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
        self.status = if self.failures.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Names of backed-up containers, in order
    pub fn backed_up(&self) -> Vec<String> {
        self.backups.iter().map(|b| b.container.clone()).collect()
    }

    pub fn total_bytes(&self) -> u64 {
        self.backups.iter().map(|b| b.bytes).sum()
    }

    /// Wall-clock duration, if finished
    pub fn duration(&self) -> Option<std::time::Duration> {
        self.completed_at
            .and_then(|end| end.signed_duration_since(self.started_at).to_std().ok())
    }
}
