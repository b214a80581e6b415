//! Remote extraction backends and the object storage they export into.
//!
//! ```text
//! ┌──────────┐   export    ┌──────────────┐   read_csv /    ┌────────┐
//! │ Exporter │ ──────────► │ ObjectStore  │ ──read_parquet─►│ Engine │
//! └──────────┘  (key/uri)  └──────────────┘                 └────────┘
//! ```
//!
//! An [`Exporter`] runs a table's query on the remote system and leaves the
//! result as a single file under a deterministic key (see [`naming`]). The
//! session then loads the file through the engine and deletes it.

pub mod naming;
mod postgres;
#[cfg(feature = "s3")]
mod s3;
mod snowflake;
mod store;

pub use postgres::{CopyOutConnection, PostgresExporter, DEFAULT_COPY_OPTIONS};
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;
pub use snowflake::{SnowflakeExporter, WarehouseConnection};
pub use store::{LocalObjectStore, ObjectStore, StorageError, StorageResult};

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

use crate::config::ExportSettings;

/// Error type returned by remote connections.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while exporting a table.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The remote query returned nothing, so no file was produced.
    #[error("Export of {table} produced no data")]
    EmptyResult { table: String },

    #[error("Export I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to derive export key: {0}")]
    Naming(#[from] serde_json::Error),

    #[error("Remote backend error: {0}")]
    Backend(#[source] BoxError),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// File format an exporter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Parquet,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One export to perform.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    /// Local table name.
    pub table: &'a str,
    /// Query to run remotely.
    pub query: &'a str,
    /// Storage key the file must land under.
    pub key: &'a str,
    pub settings: &'a ExportSettings,
}

/// A remote system that can dump a query result into object storage.
pub trait Exporter {
    /// Format of the produced file.
    fn format(&self) -> FileFormat;

    /// Run `request.query` remotely and store the result under `request.key`.
    ///
    /// Returns [`ExportError::EmptyResult`] when the query legitimately
    /// produced nothing to store.
    fn export(&self, request: &ExportRequest<'_>, store: &dyn ObjectStore) -> ExportResult<()>;

    /// Whether a CSV export starts with a header row.
    fn csv_header(&self) -> bool {
        true
    }
}
