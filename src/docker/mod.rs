//! Access to the container runtime

pub mod cli_client;
pub mod inspect;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use cli_client::DockerCli;

/// Error types for container runtime operations
#[derive(Debug, Error)]
pub enum DockerError {
    #[error("Failed to run docker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Command exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Failed to parse docker output: {0}")]
    Parse(String),

    #[error("Failed to write command output: {0}")]
    Output(#[source] std::io::Error),

    #[error("Failed to read command output: {0}")]
    Read(#[source] std::io::Error),
}

/// A running container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Full container ID
    pub id: String,

    /// Container name without the leading slash
    pub name: String,

    /// Repo tags of the container's image
    pub image_tags: Vec<String>,

    /// Image reference the container was created from
    pub image_ref: String,
}

/// Captured result of a command run inside a container
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Receives stdout chunks of a streaming exec as they arrive
pub type OutputSink<'a> = dyn FnMut(&[u8]) -> std::io::Result<()> + Send + 'a;

/// Trait for container runtimes - allows for different implementations
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List running containers
    async fn list_running(&self) -> Result<Vec<Container>, DockerError>;

    /// Run a command inside a container and capture its output
    async fn exec(&self, container: &Container, command: &[String])
        -> Result<ExecOutput, DockerError>;

    /// Run a command inside a container, feeding stdout into `sink`.
    ///
    /// Returns the number of bytes streamed. A non-zero exit status is an
    /// error even if output was produced.
    async fn exec_streaming(
        &self,
        container: &Container,
        command: &[String],
        sink: &mut OutputSink<'_>,
    ) -> Result<u64, DockerError>;

    /// Environment of the container's running processes (not just the image)
    async fn container_env(
        &self,
        container: &Container,
    ) -> Result<HashMap<String, String>, DockerError> {
        let output = self.exec(container, &["env".to_string()]).await?;
        if !output.success() {
            return Err(DockerError::Exit {
                code: output.exit_code,
                stderr: output.stderr_lossy(),
            });
        }
        Ok(parse_env(&output.stdout))
    }

    /// Check if a binary is on the container's PATH
    async fn binary_exists(
        &self,
        container: &Container,
        binary: &str,
    ) -> Result<bool, DockerError> {
        let output = self
            .exec(container, &["which".to_string(), binary.to_string()])
            .await?;
        Ok(output.success())
    }
}

/// Parse `env` output into variables.
///
/// Each line is split on its first `=` and the value is taken verbatim: no
/// quoting, comments or `$VAR` expansion, so credentials survive intact.
/// Lines without `=` (continuations of multi-line values) are skipped.
pub fn parse_env(raw: &[u8]) -> HashMap<String, String> {
    String::from_utf8_lossy(raw)
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
