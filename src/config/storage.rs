//! Object-storage credentials.
//!
//! Every option can be given explicitly or picked up from the environment:
//! - `SNOWDUCK_S3_BUCKET`: bucket that receives remote exports
//! - `S3_DUCKDB_REGION`: bucket region
//! - `S3_DUCKDB_ACCESS_KEY_ID`: access key id
//! - `S3_DUCKDB_SECRET_ACCESS_KEY`: secret access key
//!
//! Explicit values win over the environment. Blank values count as missing.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Error type for storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Must provide a valid {option}, either explicitly or as the {env_var} env var")]
    Missing {
        option: &'static str,
        env_var: &'static str,
    },
}

/// Explicitly supplied storage options; unset fields fall back to the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageOptions {
    pub remote_bucket_name: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Fully resolved storage configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub remote_bucket_name: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl StorageConfig {
    /// Resolve every option from the environment alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(&StorageOptions::default())
    }

    /// Resolve explicit options, falling back to the process environment.
    pub fn resolve(options: &StorageOptions) -> Result<Self, ConfigError> {
        Self::resolve_with(options, |name| env::var(name).ok())
    }

    /// Resolve explicit options, falling back to `lookup` for environment values.
    pub fn resolve_with<F>(options: &StorageOptions, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let field = |explicit: &Option<String>, option: &'static str, env_var: &'static str| {
            explicit
                .clone()
                .or_else(|| lookup(env_var))
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing { option, env_var })
        };

        Ok(Self {
            remote_bucket_name: field(
                &options.remote_bucket_name,
                "remote_bucket_name",
                "SNOWDUCK_S3_BUCKET",
            )?,
            region: field(&options.region, "region", "S3_DUCKDB_REGION")?,
            access_key_id: field(
                &options.access_key_id,
                "access_key_id",
                "S3_DUCKDB_ACCESS_KEY_ID",
            )?,
            secret_access_key: field(
                &options.secret_access_key,
                "secret_access_key",
                "S3_DUCKDB_SECRET_ACCESS_KEY",
            )?,
        })
    }
}

// Keeps credentials out of logs.
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("remote_bucket_name", &self.remote_bucket_name)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}
