//! Backup configuration from environment variables

use crate::core::compression::Compression;
use crate::core::schedule::CronSchedule;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_BACKUP_DIR: &str = "/var/backups";
const DEFAULT_HEALTHCHECKS_HOST: &str = "hc-ping.com";
const CUSTOM_PROVIDER_PREFIX: &str = "CUSTOM_BACKUP_PROVIDER_";
const CUSTOM_PROVIDER_SUFFIX: &str = "_PATTERNS";

/// Error types for configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown compression method: {0}")]
    UnknownCompression(String),

    #[error("Invalid schedule '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },

    #[error("Invalid pattern '{pattern}' for provider '{provider}': {reason}")]
    InvalidPattern {
        provider: String,
        pattern: String,
        reason: String,
    },
}

/// Where and how to notify after a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    pub url: String,

    /// POST the list of backed-up containers instead of a bare GET
    pub include_logs: bool,
}

/// Runtime configuration, read once at start-up
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Directory receiving backup files
    pub backup_dir: PathBuf,

    /// Cron schedule; `None` runs a single pass
    pub schedule: Option<CronSchedule>,

    /// Compression applied to every backup
    pub compression: Compression,

    /// Success hook, if any source of one is configured
    pub hook: Option<HookConfig>,

    /// Extra glob patterns per provider name (lower-case)
    pub custom_patterns: HashMap<String, Vec<String>>,

    /// Docker CLI executable
    pub docker_path: String,

    /// History database location override
    pub history_db: Option<PathBuf>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            schedule: None,
            compression: Compression::Plain,
            hook: None,
            custom_patterns: HashMap::new(),
            docker_path: "docker".to_string(),
            history_db: None,
        }
    }
}

impl BackupConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        // Empty values behave as unset
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string());

        let compression = match get("COMPRESSION") {
            Some(name) => name.parse()?,
            None => Compression::Plain,
        };

        let schedule = get("SCHEDULE").map(|expr| CronSchedule::parse(&expr)).transpose()?;

        let hook = success_hook_url(&vars).map(|url| HookConfig {
            url,
            include_logs: vars.contains_key("INCLUDE_LOGS"),
        });

        Ok(Self {
            backup_dir: get("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
            schedule,
            compression,
            hook,
            custom_patterns: custom_patterns(&vars),
            docker_path: get("DOCKER_BIN").unwrap_or_else(|| "docker".to_string()),
            history_db: get("HISTORY_DB").map(PathBuf::from),
        })
    }
}

/// Resolve the success hook URL.
///
/// An explicit `SUCCESS_HOOK_URL` wins, then a healthchecks.io check ID,
/// then an Uptime Kuma push URL.
fn success_hook_url(vars: &HashMap<String, String>) -> Option<String> {
    if let Some(url) = vars.get("SUCCESS_HOOK_URL") {
        return Some(url.trim().to_string());
    }

    if let Some(id) = vars.get("HEALTHCHECKS_ID") {
        let host = vars
            .get("HEALTHCHECKS_HOST")
            .map(|h| h.trim())
            .unwrap_or(DEFAULT_HEALTHCHECKS_HOST);
        return Some(format!("https://{}/{}", host, id.trim()));
    }

    vars.get("UPTIME_KUMA_URL").map(|url| url.trim().to_string())
}

/// Collect `CUSTOM_BACKUP_PROVIDER_<NAME>_PATTERNS` variables
fn custom_patterns(vars: &HashMap<String, String>) -> HashMap<String, Vec<String>> {
    let mut patterns = HashMap::new();

    for (key, value) in vars {
        let Some(name) = key
            .strip_prefix(CUSTOM_PROVIDER_PREFIX)
            .and_then(|rest| rest.strip_suffix(CUSTOM_PROVIDER_SUFFIX))
        else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let extra: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();

        if !extra.is_empty() {
            patterns
                .entry(name.to_lowercase())
                .or_insert_with(Vec::new)
                .extend(extra);
        }
    }

    patterns
}
