//! Success hook - pings a monitoring URL after a clean run

use crate::core::{HookConfig, RunReport};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const HOOK_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Success hook request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Notifies healthchecks.io, Uptime Kuma or any plain URL
#[derive(Debug, Clone)]
pub struct SuccessHook {
    client: Client,
    config: HookConfig,
}

impl SuccessHook {
    pub fn new(config: HookConfig) -> Result<Self, HookError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HOOK_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Send the hook for a finished run.
    ///
    /// With `include_logs` the names of the backed-up containers are POSTed,
    /// one per line; otherwise a bare GET is sent.
    pub async fn notify(&self, report: &RunReport) -> Result<(), HookError> {
        let request = if self.config.include_logs {
            self.client
                .post(&self.config.url)
                .body(report.backed_up().join("\n"))
        } else {
            self.client.get(&self.config.url)
        };

        debug!("Calling success hook {}", self.config.url);
        let response = request.send().await?;
        let status = response.status();
        response.error_for_status()?;

        info!("Success hook returned {}", status);
        Ok(())
    }
}
