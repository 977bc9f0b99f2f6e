//! Docker CLI subprocess client

use crate::docker::inspect::{build_containers, parse_containers, parse_images};
use crate::docker::{Container, ContainerRuntime, DockerError, ExecOutput, OutputSink};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

const READ_CHUNK: usize = 64 * 1024;

/// Talks to the Docker daemon by running the `docker` executable
#[derive(Debug, Clone)]
pub struct DockerCli {
    /// Path to docker executable
    docker_path: String,

    /// Timeout for inspect/env/which commands in seconds. Dumps are not
    /// bounded.
    timeout_secs: u64,
}

impl DockerCli {
    /// Create a new docker client
    ///
    /// # Arguments
    /// * `docker_path` - Path to docker executable (e.g., "docker", "/usr/bin/docker")
    /// * `timeout_secs` - Timeout for short-lived commands in seconds
    pub fn new(docker_path: String, timeout_secs: u64) -> Self {
        Self {
            docker_path,
            timeout_secs,
        }
    }

    #[cfg(test)]
    pub fn docker_path(&self) -> &str {
        &self.docker_path
    }

    /// Run a docker command to completion and capture its output
    async fn run(&self, args: &[String]) -> Result<ExecOutput, DockerError> {
        debug!("Running {} {}", self.docker_path, args.join(" "));

        let output = timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new(&self.docker_path)
                .args(args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| DockerError::Timeout(self.timeout_secs))?
        .map_err(DockerError::Spawn)?;

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Run `docker <subcommand> inspect` over several IDs.
    ///
    /// Inspect exits non-zero when any ID vanished in the meantime but still
    /// prints the documents it found, so partial output is accepted.
    async fn inspect(&self, kind: &str, ids: &[String]) -> Result<Vec<u8>, DockerError> {
        let mut args = vec![kind.to_string(), "inspect".to_string()];
        args.extend(ids.iter().cloned());

        let output = self.run(&args).await?;
        if !output.success() {
            if output.stdout.iter().any(|b| !b.is_ascii_whitespace()) {
                warn!("docker {} inspect was partial: {}", kind, output.stderr_lossy());
            } else {
                return Err(DockerError::Exit {
                    code: output.exit_code,
                    stderr: output.stderr_lossy(),
                });
            }
        }
        Ok(output.stdout)
    }

    fn exec_args(container: &Container, command: &[String]) -> Vec<String> {
        let mut args = vec!["exec".to_string(), container.id.clone()];
        args.extend(command.iter().cloned());
        args
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn list_running(&self) -> Result<Vec<Container>, DockerError> {
        let ps = self
            .run(&["ps".to_string(), "-q".to_string(), "--no-trunc".to_string()])
            .await?;
        if !ps.success() {
            return Err(DockerError::Exit {
                code: ps.exit_code,
                stderr: ps.stderr_lossy(),
            });
        }

        let ids: Vec<String> = ps
            .stdout_lossy()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let containers = parse_containers(&self.inspect("container", &ids).await?)?;
        // Everything stopped between `ps` and `inspect`
        if containers.is_empty() {
            return Ok(Vec::new());
        }

        let image_ids: Vec<String> = containers
            .iter()
            .map(|c| c.image.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let images = parse_images(&self.inspect("image", &image_ids).await?)?;

        Ok(build_containers(containers, &images))
    }

    async fn exec(
        &self,
        container: &Container,
        command: &[String],
    ) -> Result<ExecOutput, DockerError> {
        self.run(&Self::exec_args(container, command)).await
    }

    async fn exec_streaming(
        &self,
        container: &Container,
        command: &[String],
        sink: &mut OutputSink<'_>,
    ) -> Result<u64, DockerError> {
        // Arguments may carry credentials, only the program is logged
        debug!(
            "Streaming exec in {}: {}",
            container.name,
            command.first().map(String::as_str).unwrap_or_default()
        );

        let mut child = Command::new(&self.docker_path)
            .args(Self::exec_args(container, command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(DockerError::Spawn)?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| DockerError::Parse("exec stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DockerError::Parse("exec stderr was not captured".to_string()))?;

        // Drain stderr concurrently so a chatty dump can't block on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let total = pump(&mut stdout, sink).await?;

        let status = child.wait().await.map_err(DockerError::Spawn)?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(DockerError::Exit {
                code: status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(total)
    }
}

/// Copy `reader` into `sink` chunk by chunk, returning the bytes copied
async fn pump<R>(reader: &mut R, sink: &mut OutputSink<'_>) -> Result<u64, DockerError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await.map_err(DockerError::Read)?;
        if n == 0 {
            return Ok(total);
        }
        sink(&buf[..n]).map_err(DockerError::Output)?;
        total += n as u64;
    }
}
