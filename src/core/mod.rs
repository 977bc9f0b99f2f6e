//! Core domain models for backups
//!
//! Configuration, the provider registry and image matching, compression and
//! scheduling. Nothing in here talks to Docker directly.

pub mod compression;
pub mod config;
pub mod image;
pub mod pattern;
pub mod provider;
pub mod report;
pub mod schedule;

pub use compression::Compression;
pub use config::{BackupConfig, ConfigError, HookConfig};
pub use provider::{BackupMethod, BackupProvider, ProviderRegistry};
pub use report::*;
pub use schedule::CronSchedule;
