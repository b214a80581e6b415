//! # snowduck
//!
//! Dependency-ordered materialization of remote and derived tables into a
//! local DuckDB database.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Definitions                           │
//! │   (remote tables, derived tables, views + depends_on)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema]
//! ┌─────────────────────────────────────────────────────────┐
//! │           Schema (validated DAG over names)              │
//! └─────────────────────────────────────────────────────────┘
//!                │                              │
//!                ▼ [session]                    ▼ [format]
//! ┌──────────────────────────────┐  ┌──────────────────────┐
//! │  Session: prerequisites      │  │  text / mermaid      │
//! │  first, each table once      │  └──────────────────────┘
//! └──────────────────────────────┘
//!        │                │
//!        ▼ [remote]       ▼ [engine]
//! ┌──────────────┐  ┌─────────────────┐
//! │ export ─►    │  │ DuckDB          │
//! │ object store │─►│ (load / query)  │
//! └──────────────┘  └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use snowduck::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let seed = Definition::derived("numbers", "SELECT range AS n FROM range(10)", vec![]);
//! let evens = Definition::view("evens", "SELECT n FROM numbers WHERE n % 2 = 0", vec![seed]);
//! let schema = Arc::new(Schema::new(vec![evens])?);
//!
//! let mut session = Session::new(schema, DuckDbEngine::in_memory);
//! let rows = session.with_tables(&["evens"], |engine| engine.query_rows("SELECT * FROM evens"))??;
//! assert_eq!(rows.len(), 5);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod format;
pub mod graph;
pub mod remote;
pub mod schema;
pub mod session;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::{ExportSettings, Settings, StorageConfig, StorageOptions};
    pub use crate::engine::{DuckDbEngine, Engine, Row};
    pub use crate::format::{Formatter, MermaidFormatter, TextFormatter};
    pub use crate::graph::{Dag, Vertex};
    pub use crate::remote::{
        CopyOutConnection, Exporter, FileFormat, LocalObjectStore, ObjectStore, PostgresExporter,
        SnowflakeExporter, WarehouseConnection,
    };
    pub use crate::schema::{Definition, DefinitionKind, RemoteTable, Schema};
    pub use crate::session::{
        ObjectKind, Observer, RemoteContext, Session, SessionEvent, TracingObserver,
    };
    pub use crate::sql::{ColumnDef, ColumnType};
}

pub use schema::{Definition, Schema};
pub use session::Session;
