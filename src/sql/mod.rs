//! SQL generation for the local DuckDB database.

pub mod statements;
mod types;

pub use types::{ColumnDef, ColumnType};
