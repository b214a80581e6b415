//! Deterministic storage keys for remote exports.
//!
//! A key has the shape
//! `{account}/{prefix}[/{instance}]/{table}_{suffix}.{ext}` where dots in the
//! table name become underscores. The suffix is the instance discriminator
//! when one is set, otherwise a SHA-256 digest of the table's parameters, so
//! repeated runs with the same parameters reuse a key and different
//! parameters never collide.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::FileFormat;
use crate::config::ExportSettings;

/// Compute the SHA-256 of a serializable value.
///
/// The value is serialized to JSON first; with ordered maps the output is
/// deterministic. Returns a 64-character lowercase hex string.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// File name of an export: `{table}_{suffix}.{ext}`.
pub fn export_file_name(
    table: &str,
    params: &BTreeMap<String, String>,
    instance: Option<&str>,
    format: FileFormat,
) -> Result<String, serde_json::Error> {
    let suffix = match instance {
        Some(instance) => instance.to_string(),
        None => compute_hash(params)?,
    };
    Ok(format!(
        "{}_{}.{}",
        table.replace('.', "_"),
        suffix,
        format.extension()
    ))
}

/// Full storage key of an export.
pub fn export_key(
    settings: &ExportSettings,
    table: &str,
    params: &BTreeMap<String, String>,
    instance: Option<&str>,
    format: FileFormat,
) -> Result<String, serde_json::Error> {
    let file_name = export_file_name(table, params, instance, format)?;
    let segments = [
        settings.account_name.as_str(),
        settings.key_prefix.as_str(),
        instance.unwrap_or(""),
        file_name.as_str(),
    ];
    Ok(segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/"))
}
