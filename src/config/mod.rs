//! Configuration module for snowduck.
//!
//! Handles object-storage credentials, export naming and the settings file.

mod settings;
mod storage;

pub use settings::{
    expand_env_vars, ExportSettings, SessionSettings, Settings, SettingsError, DEFAULT_KEY_PREFIX,
};
pub use storage::{ConfigError, StorageConfig, StorageOptions};
