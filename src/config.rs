use crate::core::{Result, StoreError};
use crate::storage::backup::DEFAULT_RETENTION;
use std::env;
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "TASKVAULT_DATA_DIR";
pub const ENV_DATA_FILE: &str = "TASKVAULT_DATA_FILE";
pub const ENV_BACKUP_RETENTION: &str = "TASKVAULT_BACKUP_RETENTION";
pub const ENV_SEED: &str = "TASKVAULT_SEED";

/// Task store configuration
///
/// Layout on disk:
/// `<data_dir>/<data_file_name>` for the live file and
/// `<data_dir>/<backup_dir_name>/` for snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the live file and the backup directory
    pub data_dir: PathBuf,

    /// Live data file name
    pub data_file_name: String,

    /// Backup directory name, relative to `data_dir`
    pub backup_dir_name: String,

    /// Maximum number of snapshots kept
    pub backup_retention: usize,

    /// Write the sample tasks when the store is opened without a live file
    pub seed_sample_data: bool,

    /// fsync the live file and snapshots before they become visible
    pub durable_writes: bool,
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            data_file_name: "tasks.json".to_string(),
            backup_dir_name: "backups".to_string(),
            backup_retention: DEFAULT_RETENTION,
            seed_sample_data: false,
            durable_writes: true,
        }
    }

    /// Set the live data file name
    pub fn data_file_name(mut self, name: &str) -> Self {
        self.data_file_name = name.to_string();
        self
    }

    /// Set the backup directory name
    pub fn backup_dir_name(mut self, name: &str) -> Self {
        self.backup_dir_name = name.to_string();
        self
    }

    /// Set the backup retention count
    pub fn backup_retention(mut self, retention: usize) -> Self {
        self.backup_retention = retention;
        self
    }

    /// Seed sample tasks into a fresh store
    pub fn seed_sample_data(mut self, seed: bool) -> Self {
        self.seed_sample_data = seed;
        self
    }

    /// Toggle fsync on writes
    pub fn durable_writes(mut self, durable: bool) -> Self {
        self.durable_writes = durable;
        self
    }

    /// Build from `TASKVAULT_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var(ENV_DATA_DIR).unwrap_or_else(|_| "data".to_string());
        let mut config = Self::new(data_dir);

        if let Ok(name) = env::var(ENV_DATA_FILE) {
            config.data_file_name = name;
        }

        if let Ok(raw) = env::var(ENV_BACKUP_RETENTION) {
            config.backup_retention = raw.parse::<usize>().map_err(|_| {
                StoreError::Config(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_BACKUP_RETENTION, raw
                ))
            })?;
        }

        if let Ok(raw) = env::var(ENV_SEED) {
            config.seed_sample_data = parse_flag(&raw).ok_or_else(|| {
                StoreError::Config(format!("{} must be true or false, got '{}'", ENV_SEED, raw))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.backup_retention == 0 {
            return Err(StoreError::Config("backup_retention must be > 0".to_string()));
        }

        if self.data_file_name.trim().is_empty() {
            return Err(StoreError::Config("data_file_name cannot be empty".to_string()));
        }

        if self.backup_dir_name.trim().is_empty() {
            return Err(StoreError::Config("backup_dir_name cannot be empty".to_string()));
        }

        if self.data_file_name == self.backup_dir_name {
            return Err(StoreError::Config(
                "data_file_name and backup_dir_name must differ".to_string(),
            ));
        }

        Ok(())
    }

    pub fn data_file_path(&self) -> PathBuf {
        self.data_dir.join(&self.data_file_name)
    }

    pub fn backup_dir_path(&self) -> PathBuf {
        self.data_dir.join(&self.backup_dir_name)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("data")
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.data_file_path(), PathBuf::from("data/tasks.json"));
        assert_eq!(config.backup_dir_path(), PathBuf::from("data/backups"));
        assert_eq!(config.backup_retention, 10);
        assert!(!config.seed_sample_data);
    }

    #[test]
    fn test_builder_pattern() {
        let config = StoreConfig::new("/var/lib/tasks")
            .data_file_name("live.json")
            .backup_dir_name("snapshots")
            .backup_retention(3)
            .seed_sample_data(true);

        assert_eq!(config.data_file_path(), PathBuf::from("/var/lib/tasks/live.json"));
        assert_eq!(config.backup_dir_path(), PathBuf::from("/var/lib/tasks/snapshots"));
        assert_eq!(config.backup_retention, 3);
        assert!(config.seed_sample_data);
    }

    #[test]
    fn test_validate() {
        assert!(StoreConfig::default().validate().is_ok());
        assert!(StoreConfig::default().backup_retention(0).validate().is_err());
        assert!(StoreConfig::default().data_file_name(" ").validate().is_err());
        assert!(
            StoreConfig::default()
                .data_file_name("x")
                .backup_dir_name("x")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
