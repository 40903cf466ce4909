use crate::os::{RetryPolicy, Timeout};
use log::LevelFilter;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Reader runtime configuration (simple key=value format).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub timeout: Timeout,
    pub retry: RetryPolicy,
    pub log_level: LevelFilter,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            timeout: Timeout::Infinite,
            retry: RetryPolicy::default(),
            log_level: LevelFilter::Info,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration")]
    Io(#[from] io::Error),
    #[error("invalid configuration line: {0:?}")]
    InvalidFormat(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

impl ReaderConfig {
    /// Load configuration from a simple key=value file.
    /// Example:
    /// timeout_ms=-1
    /// max_retries=10
    /// retry_delay_ms=10
    /// log_level=info
    ///
    /// Missing keys keep their defaults; `timeout_ms` < 0 blocks forever.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = ReaderConfig::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, val) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => return Err(ConfigError::InvalidFormat(line.to_string())),
            };
            let invalid = || ConfigError::InvalidValue {
                key: key.to_string(),
                value: val.to_string(),
            };

            match key {
                "timeout_ms" => {
                    config.timeout = Timeout::from_millis(val.parse().map_err(|_| invalid())?)
                }
                "max_retries" => config.retry.max_retries = val.parse().map_err(|_| invalid())?,
                "retry_delay_ms" => {
                    config.retry.delay = Duration::from_millis(val.parse().map_err(|_| invalid())?)
                }
                "log_level" => config.log_level = val.parse().map_err(|_| invalid())?,
                _ => return Err(ConfigError::InvalidFormat(line.to_string())),
            }
        }

        Ok(config)
    }
}
