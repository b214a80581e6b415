//! Column types declared on remote tables.
//!
//! Remote exports land as CSV or Parquet files. CSV type detection falls back
//! to `VARCHAR` for empty files, and an export that produced no rows may not
//! produce a file at all, so every remote table declares its columns up front.
//! The declared types are rendered in DuckDB spelling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// DuckDB column type.
///
/// # Examples
///
/// ```
/// use snowduck::sql::ColumnType;
///
/// assert_eq!(ColumnType::parse("bigint"), Some(ColumnType::Int64));
/// assert_eq!(ColumnType::parse("varchar(255)"), Some(ColumnType::VarcharN(255)));
/// assert_eq!(ColumnType::parse("decimal(18,2)"), Some(ColumnType::Decimal(18, 2)));
/// assert_eq!(ColumnType::Int32.to_string(), "INTEGER");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,

    /// Fixed-precision decimal: precision, scale.
    Decimal(u8, u8),

    /// Unbounded string.
    Varchar,

    /// String with a maximum length.
    VarcharN(u16),

    Date,
    Time,
    Timestamp,
    TimestampTz,
    Blob,
    Json,
    Uuid,
}

impl ColumnType {
    /// Parse a SQL type name.
    ///
    /// Accepts the common spellings of Postgres, Snowflake and DuckDB:
    /// `int`/`integer`/`int4`, `bigint`/`int8`, `text`/`string`/`varchar`,
    /// `varchar(n)`, `decimal(p,s)`/`numeric(p,s)`/`number(p,s)`,
    /// `timestamp_ntz`, `timestamp_tz`, `variant` and so on.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();

        if let Some(inner) = extract_parens(&s, "decimal")
            .or_else(|| extract_parens(&s, "numeric"))
            .or_else(|| extract_parens(&s, "number"))
        {
            return parse_decimal_params(&inner);
        }

        if let Some(inner) = extract_parens(&s, "varchar")
            .or_else(|| extract_parens(&s, "character varying"))
        {
            return parse_length_param(&inner).map(ColumnType::VarcharN);
        }

        match s.as_str() {
            "bool" | "boolean" => Some(ColumnType::Bool),

            "tinyint" | "int1" => Some(ColumnType::Int8),
            "smallint" | "int2" => Some(ColumnType::Int16),
            "int" | "integer" | "int4" | "int32" => Some(ColumnType::Int32),
            "bigint" | "int8" | "int64" => Some(ColumnType::Int64),

            "real" | "float4" => Some(ColumnType::Float32),
            "double" | "float8" | "double precision" | "float" => Some(ColumnType::Float64),

            "decimal" | "numeric" | "number" => Some(ColumnType::Decimal(18, 3)),

            "text" | "string" | "varchar" | "character varying" => Some(ColumnType::Varchar),

            "date" => Some(ColumnType::Date),
            "time" => Some(ColumnType::Time),
            "timestamp" | "datetime" | "timestamp_ntz" => Some(ColumnType::Timestamp),
            "timestamptz" | "timestamp with time zone" | "timestamp_tz" | "timestamp_ltz" => {
                Some(ColumnType::TimestampTz)
            }

            "blob" | "bytea" | "binary" | "varbinary" => Some(ColumnType::Blob),
            "json" | "jsonb" | "variant" => Some(ColumnType::Json),
            "uuid" => Some(ColumnType::Uuid),

            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Bool => write!(f, "BOOLEAN"),
            ColumnType::Int8 => write!(f, "TINYINT"),
            ColumnType::Int16 => write!(f, "SMALLINT"),
            ColumnType::Int32 => write!(f, "INTEGER"),
            ColumnType::Int64 => write!(f, "BIGINT"),
            ColumnType::Float32 => write!(f, "FLOAT"),
            ColumnType::Float64 => write!(f, "DOUBLE"),
            ColumnType::Decimal(p, s) => write!(f, "DECIMAL({}, {})", p, s),
            ColumnType::Varchar => write!(f, "VARCHAR"),
            ColumnType::VarcharN(n) => write!(f, "VARCHAR({})", n),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Time => write!(f, "TIME"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::TimestampTz => write!(f, "TIMESTAMP WITH TIME ZONE"),
            ColumnType::Blob => write!(f, "BLOB"),
            ColumnType::Json => write!(f, "JSON"),
            ColumnType::Uuid => write!(f, "UUID"),
        }
    }
}

/// A declared column: name plus type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Extract content inside parentheses for a given type prefix.
/// e.g., extract_parens("decimal(10,2)", "decimal") returns Some("10,2")
fn extract_parens(s: &str, prefix: &str) -> Option<String> {
    let rest = s.strip_prefix(prefix)?.trim();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.to_string())
}

fn parse_decimal_params(inner: &str) -> Option<ColumnType> {
    let parts: Vec<&str> = inner.split(',').map(|s| s.trim()).collect();
    match parts.as_slice() {
        [precision] => Some(ColumnType::Decimal(precision.parse().ok()?, 0)),
        [precision, scale] => Some(ColumnType::Decimal(
            precision.parse().ok()?,
            scale.parse().ok()?,
        )),
        _ => None,
    }
}

fn parse_length_param(inner: &str) -> Option<u16> {
    inner.trim().parse().ok()
}
