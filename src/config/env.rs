use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::rules::RulesError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rules_path: Option<PathBuf>,
    pub page_url: String,
    pub watch: WatchConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub poll_interval: Duration,
    pub mutation_buffer: usize,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            page_url: "about:blank".to_string(),
            watch: WatchConfig::default(),
            directories: DirectoryConfig {
                logs_dir: "logs".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            mutation_buffer: 64,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error(transparent)]
    Rules(#[from] RulesError),
}
