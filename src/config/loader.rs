use std::{env, path::PathBuf, str::FromStr, time::Duration};

use super::env::{AppConfig, ConfigError, DirectoryConfig, LoggingConfig, WatchConfig};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(|key| env::var(key).ok())
}

impl AppConfig {
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rules_path = var("POPUP_GUARD_RULES").map(PathBuf::from);
        let page_url = var("PAGE_URL").unwrap_or(defaults.page_url);

        let poll_ms: u64 = parse_or(&var, "POLL_INTERVAL_MS", 500)?;
        if poll_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_MS",
                value: "0".to_string(),
            });
        }
        let watch = WatchConfig {
            poll_interval: Duration::from_millis(poll_ms),
            mutation_buffer: parse_or(&var, "MUTATION_BUFFER", defaults.watch.mutation_buffer)?,
        };

        let directories = DirectoryConfig {
            logs_dir: var("LOGS_DIR").unwrap_or(defaults.directories.logs_dir),
        };

        let logging = LoggingConfig {
            level: var("LOG_LEVEL").unwrap_or(defaults.logging.level),
        };

        Ok(Self {
            rules_path,
            page_url,
            watch,
            directories,
            logging,
        })
    }
}

fn parse_or<T, V>(var: &V, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
