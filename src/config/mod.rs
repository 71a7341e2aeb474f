pub mod env;
mod loader;

pub use env::{AppConfig, ConfigError, DirectoryConfig, LoggingConfig, WatchConfig};
pub use loader::load_config;
