use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Operator configuration
///
/// Read from an optional YAML file. Fields missing from the file fall back
/// to `KUBETF_*` environment variables, then to built-in defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Image for workspace pods
    #[serde(default = "default_image")]
    pub image: String,

    /// Directory holding the object store
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    #[serde(default)]
    pub backup: BackupConfig,

    /// How often to look for changed objects
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// How often every workspace is reconciled regardless of changes
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Delay before retrying a reconcile that failed transiently
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Upper bound on a single reconcile
    #[serde(default = "default_reconcile_timeout")]
    pub reconcile_timeout_secs: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciles: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupProvider {
    /// Backups disabled; workspaces naming a bucket report the missing client
    None,
    /// One directory per bucket under `dir`
    Fs,
    /// Google Cloud Storage
    Gcs,
}

impl BackupProvider {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(BackupProvider::None),
            "fs" | "file" => Some(BackupProvider::Fs),
            "gcs" => Some(BackupProvider::Gcs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    #[serde(default = "default_backup_provider")]
    pub provider: BackupProvider,

    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_gcs_endpoint")]
    pub gcs_endpoint: String,

    #[serde(default = "default_gcs_token")]
    pub gcs_token: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_var(name).and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn state_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".kubetf")
}

fn default_image() -> String {
    env_var("KUBETF_IMAGE").unwrap_or_else(|| kubetf_controller::DEFAULT_IMAGE.to_string())
}

fn default_store_dir() -> PathBuf {
    env_var("KUBETF_STORE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| state_dir().join("store"))
}

fn default_backup_provider() -> BackupProvider {
    env_var("KUBETF_BACKUP_PROVIDER")
        .and_then(|s| BackupProvider::parse(&s))
        .unwrap_or(BackupProvider::None)
}

fn default_backup_dir() -> PathBuf {
    env_var("KUBETF_BACKUP_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| state_dir().join("backups"))
}

fn default_gcs_endpoint() -> String {
    env_var("KUBETF_GCS_ENDPOINT")
        .unwrap_or_else(|| kubetf_backup::GcsBlobStore::DEFAULT_ENDPOINT.to_string())
}

fn default_gcs_token() -> Option<String> {
    env_var("KUBETF_GCS_TOKEN")
}

fn default_poll_interval() -> u64 {
    env_parse("KUBETF_POLL_INTERVAL", 2)
}

fn default_sync_interval() -> u64 {
    env_parse("KUBETF_SYNC_INTERVAL", 300)
}

fn default_retry_delay() -> u64 {
    env_parse("KUBETF_RETRY_DELAY", 10)
}

fn default_reconcile_timeout() -> u64 {
    env_parse("KUBETF_RECONCILE_TIMEOUT", 60)
}

fn default_max_concurrent() -> usize {
    env_parse("KUBETF_MAX_CONCURRENT", 4)
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            provider: default_backup_provider(),
            dir: default_backup_dir(),
            gcs_endpoint: default_gcs_endpoint(),
            gcs_token: default_gcs_token(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image: default_image(),
            store_dir: default_store_dir(),
            backup: BackupConfig::default(),
            poll_interval_secs: default_poll_interval(),
            sync_interval_secs: default_sync_interval(),
            retry_delay_secs: default_retry_delay(),
            reconcile_timeout_secs: default_reconcile_timeout(),
            max_concurrent_reconciles: default_max_concurrent(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Load from `path` if given, otherwise from the environment alone
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_yaml(&contents)
                    .with_context(|| format!("Invalid config file {}", path.display()))
            }
            None => Ok(Self::from_env()),
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // an empty document deserializes as null rather than an empty map
        if contents.trim().is_empty() {
            return Ok(Self::from_env());
        }
        Ok(serde_yaml_ng::from_str(contents)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_overrides_defaults() {
        let config = Config::from_yaml(
            r#"
image: registry.local/kubetf:1.2
store_dir: /var/lib/kubetf
backup:
  provider: fs
  dir: /var/backups
retry_delay_secs: 3
max_concurrent_reconciles: 8
"#,
        )
        .expect("parse config");

        assert_eq!(config.image, "registry.local/kubetf:1.2");
        assert_eq!(config.store_dir, PathBuf::from("/var/lib/kubetf"));
        assert_eq!(config.backup.provider, BackupProvider::Fs);
        assert_eq!(config.backup.dir, PathBuf::from("/var/backups"));
        assert_eq!(config.retry_delay(), Duration::from_secs(3));
        assert_eq!(config.max_concurrent_reconciles, 8);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_yaml("  \n").expect("parse config");
        assert!(!config.image.is_empty());
        assert!(config.poll_interval() >= Duration::from_secs(1));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(Config::from_yaml("imgae: typo").is_err());
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(BackupProvider::parse("GCS"), Some(BackupProvider::Gcs));
        assert_eq!(BackupProvider::parse("file"), Some(BackupProvider::Fs));
        assert_eq!(BackupProvider::parse("s3"), None);
    }
}
