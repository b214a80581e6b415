//! TOML-based configuration for snowduck.
//!
//! Supports a config file (snowduck.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [storage]
//! remote_bucket_name = "${EXPORT_BUCKET}"
//! region = "eu-west-1"
//!
//! [export]
//! account_name = "${SNOWFLAKE_ACCOUNT_NAME}"
//! key_prefix = "snowduck_export"
//!
//! [session]
//! database = "./data/local.duckdb"
//! ```
//!
//! Storage options left out of the file are taken from the environment when
//! the storage configuration is resolved (see [`StorageConfig`]).

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::storage::{ConfigError, StorageConfig, StorageOptions};

/// Key prefix placed between the account name and the exported file name.
pub const DEFAULT_KEY_PREFIX: &str = "snowduck_export";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error(transparent)]
    Storage(#[from] ConfigError),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Object-storage options.
    pub storage: StorageOptions,

    /// Remote export naming.
    pub export: ExportSettings,

    /// Local database.
    pub session: SessionSettings,
}

/// How remote exports are named and where they are staged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Warehouse account; first segment of every export key.
    pub account_name: String,

    /// Second segment of every export key.
    pub key_prefix: String,

    /// Directory backing a local object store instead of S3.
    pub local_dir: Option<PathBuf>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            account_name: String::new(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            local_dir: None,
        }
    }
}

impl ExportSettings {
    /// Settings for `account_name` with the default prefix.
    pub fn for_account(account_name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            ..Default::default()
        }
    }

    /// Default settings with the account taken from `SNOWFLAKE_ACCOUNT_NAME`.
    pub fn from_env() -> Self {
        Self::for_account(env::var("SNOWFLAKE_ACCOUNT_NAME").unwrap_or_default())
    }

    /// Storage integration used by warehouse `COPY INTO` statements.
    pub fn storage_integration(&self) -> String {
        format!("S3_STORAGE_INTEGRATION_{}", self.account_name)
    }
}

/// Local database settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Database file; in-memory when unset.
    pub database: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text, expanding `${VAR}` references.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.expanded()
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SNOWDUCK_CONFIG`
    /// 2. `./snowduck.toml`
    /// 3. `~/.snowduck/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SNOWDUCK_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("snowduck.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".snowduck").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Resolve the storage configuration, falling back to the environment.
    pub fn storage_config(&self) -> Result<StorageConfig, SettingsError> {
        Ok(StorageConfig::resolve(&self.storage)?)
    }

    fn expanded(mut self) -> Result<Self, SettingsError> {
        for value in [
            &mut self.storage.remote_bucket_name,
            &mut self.storage.region,
            &mut self.storage.access_key_id,
            &mut self.storage.secret_access_key,
        ]
        .into_iter()
        .flatten()
        {
            *value = expand_env_vars(value)?;
        }

        self.export.account_name = expand_env_vars(&self.export.account_name)?;
        self.export.key_prefix = expand_env_vars(&self.export.key_prefix)?;
        if let Some(dir) = &self.export.local_dir {
            self.export.local_dir = Some(expand_path(dir)?);
        }
        if let Some(database) = &self.session.database {
            self.session.database = Some(expand_path(database)?);
        }

        Ok(self)
    }
}

fn expand_path(path: &Path) -> Result<PathBuf, SettingsError> {
    Ok(PathBuf::from(expand_env_vars(&path.to_string_lossy())?))
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
