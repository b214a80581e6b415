//! DuckDB-backed [`Engine`].

use std::path::Path;

use ::duckdb::types::{TimeUnit, ValueRef};
use ::duckdb::{Connection, Row as DuckRow};
use chrono::{DateTime, NaiveTime};
use serde_json::Value;

use super::{Engine, EngineError, EngineResult, Row};
use crate::config::StorageConfig;
use crate::sql::statements::quote_literal;

/// Name of the S3 secret registered by [`DuckDbEngine::open`].
const SECRET_NAME: &str = "snowduck_s3_secret";

const SECONDS_PER_DAY: i64 = 86_400;
const MICROS_PER_SECOND: i64 = 1_000_000;

/// A DuckDB connection.
pub struct DuckDbEngine {
    connection: Connection,
}

impl DuckDbEngine {
    /// Open a private in-memory database.
    pub fn in_memory() -> EngineResult<Self> {
        let connection = Connection::open_in_memory()?;
        tracing::debug!("opened in-memory DuckDB database");
        Ok(Self { connection })
    }

    /// Open (or create) a database file.
    ///
    /// With `storage` set, the `aws` and `httpfs` extensions are installed and
    /// an S3 secret is registered so that `s3://` URIs can be read.
    pub fn open(path: impl AsRef<Path>, storage: Option<&StorageConfig>) -> EngineResult<Self> {
        let path = path.as_ref();
        let connection = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened DuckDB database");

        let engine = Self { connection };
        if let Some(storage) = storage {
            engine.register_storage(storage)?;
        }
        Ok(engine)
    }

    /// Open an in-memory database with S3 access configured.
    pub fn in_memory_with_storage(storage: &StorageConfig) -> EngineResult<Self> {
        let engine = Self::in_memory()?;
        engine.register_storage(storage)?;
        Ok(engine)
    }

    /// Wrap an existing connection.
    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    fn register_storage(&self, storage: &StorageConfig) -> EngineResult<()> {
        self.connection.execute_batch("INSTALL aws; INSTALL httpfs;")?;
        self.connection.execute_batch(&format!(
            "CREATE SECRET {} (TYPE S3, KEY_ID {}, SECRET {}, REGION {});",
            SECRET_NAME,
            quote_literal(&storage.access_key_id),
            quote_literal(&storage.secret_access_key),
            quote_literal(&storage.region),
        ))?;
        tracing::debug!(region = %storage.region, "registered S3 secret");
        Ok(())
    }
}

impl Engine for DuckDbEngine {
    fn execute(&self, sql: &str) -> EngineResult<usize> {
        let affected = self.connection.execute(sql, [])?;
        tracing::debug!(affected, "statement executed");
        Ok(affected)
    }

    fn execute_batch(&self, sql: &str) -> EngineResult<()> {
        self.connection.execute_batch(sql)?;
        Ok(())
    }

    fn query_rows(&self, sql: &str) -> EngineResult<Vec<Row>> {
        let mut stmt = self.connection.prepare(sql)?;
        let mut rows = stmt.query([])?;

        // Column names are only known once the statement has run.
        let columns: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names().iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let values = columns
                .iter()
                .enumerate()
                .map(|(idx, column)| column_value(row, column, idx))
                .collect::<EngineResult<Vec<_>>>()?;
            result.push(Row::new(columns.clone(), values));
        }

        tracing::debug!(row_count = result.len(), "query completed");
        Ok(result)
    }
}

impl std::fmt::Debug for DuckDbEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbEngine").finish_non_exhaustive()
    }
}

/// Convert one column of a DuckDB row into JSON.
///
/// Decimals become strings so that no digits are lost. Dates, times and
/// timestamps become ISO 8601 strings. `HUGEINT` values that do not fit an
/// `i64` become strings too. Nested types are rejected.
fn column_value(row: &DuckRow<'_>, column: &str, idx: usize) -> EngineResult<Value> {
    let conversion = |reason: String| EngineError::Conversion {
        column: column.to_string(),
        reason,
    };

    let value = match row.get_ref(idx)? {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::from(i),
        ValueRef::SmallInt(i) => Value::from(i),
        ValueRef::Int(i) => Value::from(i),
        ValueRef::BigInt(i) => Value::from(i),
        ValueRef::UTinyInt(i) => Value::from(i),
        ValueRef::USmallInt(i) => Value::from(i),
        ValueRef::UInt(i) => Value::from(i),
        ValueRef::UBigInt(i) => Value::from(i),
        ValueRef::HugeInt(i) => match i64::try_from(i) {
            Ok(small) => Value::from(small),
            Err(_) => Value::String(i.to_string()),
        },
        ValueRef::Float(f) => Value::from(f64::from(f)),
        ValueRef::Double(f) => Value::from(f),
        ValueRef::Decimal(d) => Value::String(d.to_string()),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|&b| Value::from(b)).collect()),
        ValueRef::Date32(days) => DateTime::from_timestamp(i64::from(days) * SECONDS_PER_DAY, 0)
            .map(|dt| Value::String(dt.date_naive().to_string()))
            .ok_or_else(|| conversion(format!("date {} days from epoch is out of range", days)))?,
        ValueRef::Time64(unit, value) => {
            let micros = to_micros(unit, value);
            u32::try_from(micros / MICROS_PER_SECOND)
                .ok()
                .and_then(|secs| {
                    let nanos = (micros % MICROS_PER_SECOND) as u32 * 1_000;
                    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                })
                .map(|time| Value::String(time.format("%H:%M:%S%.f").to_string()))
                .ok_or_else(|| conversion(format!("time {}us is out of range", micros)))?
        }
        ValueRef::Timestamp(unit, value) => {
            let micros = to_micros(unit, value);
            DateTime::from_timestamp_micros(micros)
                .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
                .map(Value::String)
                .ok_or_else(|| conversion(format!("timestamp {}us is out of range", micros)))?
        }
        other => return Err(conversion(format!("unsupported type {:?}", other.data_type()))),
    };
    Ok(value)
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value * MICROS_PER_SECOND,
        TimeUnit::Millisecond => value * 1_000,
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}
