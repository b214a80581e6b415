//! The local analytical engine.
//!
//! A session only needs three operations from the engine: run a single
//! statement, run a batch of statements, and run a query that returns rows.
//! [`DuckDbEngine`] is the bundled implementation; tests substitute
//! recording fakes.

mod duckdb;

pub use self::duckdb::DuckDbEngine;

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Matches the engine messages raised when a remote file does not exist.
static NOT_FOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"HTTP Error.*404 \(Not Found\)|No files found that match the pattern").unwrap()
});

/// Matches the engine messages raised when an extension cannot be loaded.
static MISSING_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Extension Autoloading Error|required extension").unwrap()
});

/// Errors raised by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Cannot read column {column}: {reason}")]
    Conversion { column: String, reason: String },
}

impl EngineError {
    /// True if the error reports a missing remote file.
    pub fn is_not_found(&self) -> bool {
        NOT_FOUND.is_match(&self.to_string())
    }

    /// True if the engine lacks an extension it needs, such as `parquet`.
    pub fn is_missing_extension(&self) -> bool {
        MISSING_EXTENSION.is_match(&self.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A live handle to the local database.
pub trait Engine {
    /// Run one statement, returning the number of affected rows.
    fn execute(&self, sql: &str) -> EngineResult<usize>;

    /// Run a string of `;`-separated statements.
    fn execute_batch(&self, sql: &str) -> EngineResult<()>;

    /// Run a query and collect every row.
    fn query_rows(&self, sql: &str) -> EngineResult<Vec<Row>>;
}

/// A result row: column names paired with JSON values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// String value of the named column, if it is a string.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }
}
