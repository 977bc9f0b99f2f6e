//! Backup providers - which images we know how to dump, and how

use crate::core::config::ConfigError;
use crate::core::pattern::GlobPattern;
use crate::docker::{Container, ContainerRuntime, DockerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Error building a backup command
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unable to find MySQL root password")]
    MissingRootPassword,

    #[error(transparent)]
    Docker(#[from] DockerError),
}

/// How a provider produces its dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMethod {
    Postgres,
    Mysql,
    Redis,
}

/// A kind of database we can back up
#[derive(Debug, Clone)]
pub struct BackupProvider {
    /// Provider name (`postgres`, `mysql`, `redis`)
    pub name: String,

    /// Image name patterns this provider handles
    pub patterns: Vec<GlobPattern>,

    pub method: BackupMethod,

    /// Extension of the uncompressed dump, without the dot
    pub file_extension: String,
}

impl BackupProvider {
    fn new(name: &str, patterns: &[&str], method: BackupMethod, file_extension: &str) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns
                .iter()
                .map(|p| GlobPattern::new(p).expect("built-in patterns are valid"))
                .collect(),
            method,
            file_extension: file_extension.to_string(),
        }
    }

    /// Check if any of the provider's patterns match an image name
    pub fn matches(&self, image_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(image_name))
    }

    /// Build the command that writes a dump to stdout inside `container`
    pub async fn backup_command<R>(
        &self,
        runtime: &R,
        container: &Container,
    ) -> Result<Vec<String>, ProviderError>
    where
        R: ContainerRuntime + ?Sized,
    {
        match self.method {
            BackupMethod::Postgres => {
                let env = runtime.container_env(container).await?;
                Ok(postgres_command(&env))
            }
            BackupMethod::Mysql => {
                let env = runtime.container_env(container).await?;
                let has_mariadb_dump = runtime.binary_exists(container, "mariadb-dump").await?;
                mysql_command(&env, has_mariadb_dump)
            }
            BackupMethod::Redis => Ok(redis_command(&temp_file_name())),
        }
    }
}

fn postgres_command(env: &HashMap<String, String>) -> Vec<String> {
    let user = env
        .get("POSTGRES_USER")
        .filter(|u| !u.is_empty())
        .map(String::as_str)
        .unwrap_or("postgres");
    vec!["pg_dumpall".to_string(), "-U".to_string(), user.to_string()]
}

fn mysql_command(
    env: &HashMap<String, String>,
    has_mariadb_dump: bool,
) -> Result<Vec<String>, ProviderError> {
    let password = ["MYSQL_ROOT_PASSWORD", "MARIADB_ROOT_PASSWORD"]
        .iter()
        .filter_map(|key| env.get(*key))
        .find(|value| !value.is_empty())
        .ok_or(ProviderError::MissingRootPassword)?;

    // Newer MariaDB images no longer ship the mysqldump alias
    let binary = if has_mariadb_dump { "mariadb-dump" } else { "mysqldump" };

    Ok(vec![
        binary.to_string(),
        format!("-p{}", password),
        "--all-databases".to_string(),
    ])
}

/// `redis-cli --rdb` writes a point-in-time snapshot without blocking the
/// server the way `SAVE` does
fn redis_command(file_name: &str) -> Vec<String> {
    let path = format!("/tmp/{}", file_name);
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("redis-cli --rdb {path} > /dev/null && cat {path} && rm {path}"),
    ]
}

/// Random name for in-flight files, shared with the backup directory
pub fn temp_file_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(".auto-backup-{}", &id[..8])
}

/// Ordered set of providers; earlier providers win ties
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<BackupProvider>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            providers: vec![
                BackupProvider::new(
                    "postgres",
                    &[
                        "postgres",
                        "tensorchord/pgvecto-rs",
                        "nextcloud/aio-postgresql",
                        "timescale/timescaledb",
                        "pgautoupgrade/pgautoupgrade",
                    ],
                    BackupMethod::Postgres,
                    "sql",
                ),
                BackupProvider::new(
                    "mysql",
                    &["mysql", "mariadb", "linuxserver/mariadb"],
                    BackupMethod::Mysql,
                    "sql",
                ),
                BackupProvider::new("redis", &["redis"], BackupMethod::Redis, "rdb"),
            ],
        }
    }
}

impl ProviderRegistry {
    /// Built-in providers extended with custom patterns
    pub fn with_custom_patterns(
        custom: &HashMap<String, Vec<String>>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        for (name, patterns) in custom {
            if !registry.extend_patterns(name, patterns)? {
                warn!("Ignoring custom patterns for unknown backup provider '{}'", name);
            }
        }
        Ok(registry)
    }

    /// Append patterns to an existing provider.
    ///
    /// Returns `false` if no provider has that name.
    pub fn extend_patterns(
        &mut self,
        name: &str,
        patterns: &[String],
    ) -> Result<bool, ConfigError> {
        let Some(provider) = self
            .providers
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        else {
            return Ok(false);
        };

        for pattern in patterns {
            let compiled = GlobPattern::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                provider: provider.name.clone(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            provider.patterns.push(compiled);
        }
        Ok(true)
    }

    /// Find the provider for a container known by `names`.
    ///
    /// Names are tried in order; for each, the first matching provider wins.
    pub fn find<I, S>(&self, names: I) -> Option<&BackupProvider>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().find_map(|name| {
            self.providers
                .iter()
                .find(|provider| provider.matches(name.as_ref()))
        })
    }

    pub fn providers(&self) -> &[BackupProvider] {
        &self.providers
    }
}
