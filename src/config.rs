use crate::rpc::RetryPolicy;
use serde_derive::Deserialize;
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

pub const DB_DIR_PREFIX: &str = ".staking_index_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid log level {0:?}")]
    LogLevel(String),
    #[error("rpc endpoint must not be empty")]
    MissingRpc,
}

/// Settings read once at startup from a YAML file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Query API port
    pub port: u16,
    /// Suffix of the database directory name
    pub db_tail_fix: String,
    pub data_dir: PathBuf,
    pub rpc: String,
    pub chain_name: String,
    pub account_prefix: String,
    pub bond_denom: String,
    pub start_height: Option<u64>,
    pub poll_interval_secs: u64,
    /// Negative retries forever
    pub retry_attempts: i64,
    pub retry_max_wait_secs: u64,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub log_level_stdout: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_tail_fix: "main".to_string(),
            data_dir: std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from),
            rpc: String::new(),
            chain_name: "mtt".to_string(),
            account_prefix: "mtt".to_string(),
            bond_denom: "amtt".to_string(),
            start_height: None,
            poll_interval_secs: 3,
            retry_attempts: 10,
            retry_max_wait_secs: 10,
            log_dir: PathBuf::from("."),
            log_level: "info".to_string(),
            log_level_stdout: "info".to_string(),
        }
    }
}

impl IndexerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)?;
        if config.rpc.trim().is_empty() {
            return Err(ConfigError::MissingRpc);
        }
        config.file_log_level()?;
        config.stdout_log_level()?;
        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{DB_DIR_PREFIX}{}", self.db_tail_fix))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(self.retry_attempts, self.retry_max_wait_secs)
    }

    pub fn file_log_level(&self) -> Result<LevelFilter, ConfigError> {
        parse_level(&self.log_level)
    }

    pub fn stdout_log_level(&self) -> Result<LevelFilter, ConfigError> {
        parse_level(&self.log_level_stdout)
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(level).map_err(|_| ConfigError::LogLevel(level.to_string()))
}
