//! Scenario-based tests for db-auto-backup

#[path = "../helpers.rs"]
mod helpers;

mod backup_runs;
mod failure_handling;
mod scheduling;
