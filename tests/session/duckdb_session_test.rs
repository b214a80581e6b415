// tests/session/duckdb_session_test.rs
//
// End-to-end sessions against a real in-memory DuckDB database, with remote
// exports staged in a temporary directory.

use std::io::Write;
use std::sync::Arc;

use serde_json::json;
use snowduck::config::{ExportSettings, Settings};
use snowduck::engine::{DuckDbEngine, Engine, Row};
use snowduck::remote::{
    BoxError, CopyOutConnection, ExportRequest, ExportResult, Exporter, FileFormat,
    LocalObjectStore, ObjectStore, PostgresExporter,
};
use snowduck::schema::{Definition, RemoteTable, Schema};
use snowduck::session::{RemoteContext, Session};
use snowduck::sql::ColumnType;

/// Stands in for a Postgres connection by emitting fixed CSV.
struct CannedCopy(&'static str);

impl CopyOutConnection for CannedCopy {
    fn copy_out(&self, _statement: &str, sink: &mut dyn Write) -> Result<u64, BoxError> {
        sink.write_all(self.0.as_bytes())?;
        Ok(self.0.len() as u64)
    }
}

/// A warehouse unload that wrote no files.
struct NothingUnloaded;

impl Exporter for NothingUnloaded {
    fn format(&self) -> FileFormat {
        FileFormat::Parquet
    }

    fn export(&self, _request: &ExportRequest<'_>, _store: &dyn ObjectStore) -> ExportResult<()> {
        Ok(())
    }
}

fn numbers_schema() -> Arc<Schema> {
    let numbers = Definition::derived("numbers", "SELECT range AS n FROM range(10)", vec![]);
    let evens = Definition::view(
        "evens",
        "SELECT n FROM numbers WHERE n % 2 = 0",
        vec![numbers],
    );
    Arc::new(Schema::new(vec![evens]).unwrap())
}

fn column_types(engine: &DuckDbEngine, table: &str) -> Vec<(String, String)> {
    engine
        .query_rows(&format!("DESCRIBE {}", table))
        .unwrap()
        .iter()
        .map(|row| {
            (
                row.get_str("column_name").unwrap().to_string(),
                row.get_str("column_type").unwrap().to_string(),
            )
        })
        .collect()
}

fn names(rows: &[Row], column: &str) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get_str(column).map(str::to_string))
        .collect()
}

#[test]
fn test_view_over_derived_table() {
    let mut session = Session::new(numbers_schema(), DuckDbEngine::in_memory);

    let rows = session
        .with_tables(&["evens"], |engine| {
            engine.query_rows("SELECT n FROM evens ORDER BY n")
        })
        .unwrap()
        .unwrap();

    let values: Vec<_> = rows.iter().map(|row| row.get("n").cloned().unwrap()).collect();
    assert_eq!(values, vec![json!(0), json!(2), json!(4), json!(6), json!(8)]);
    assert_eq!(names(&session.user_tables().unwrap(), "table_name"), vec!["numbers"]);
    assert_eq!(names(&session.user_views().unwrap(), "view_name"), vec!["evens"]);
}

#[test]
fn test_postgres_csv_export_is_loaded_and_removed() {
    let staging = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalObjectStore::new(staging.path()));
    let exporter = PostgresExporter::new(CannedCopy("id,label\n1,alpha\n2,beta\n"));
    let items = Definition::remote(
        "items",
        "SELECT id, label FROM items",
        RemoteTable::new(Arc::new(exporter))
            .column("id", ColumnType::Int64)
            .column("label", ColumnType::Varchar)
            .instance("7"),
    );
    let schema = Arc::new(Schema::new(vec![items]).unwrap());
    let mut session = Session::new(schema, DuckDbEngine::in_memory).with_remote(
        RemoteContext::new(store.clone(), ExportSettings::for_account("ACME")),
    );

    session.ensure_materialized("items").unwrap();

    let rows = session
        .query_rows("SELECT id, label FROM items ORDER BY id")
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("id"), Some(&json!(1)));
    assert_eq!(rows[1].get_str("label"), Some("beta"));

    let engine = session.engine().unwrap();
    assert_eq!(
        column_types(engine, "items"),
        vec![
            ("id".to_string(), "BIGINT".to_string()),
            ("label".to_string(), "VARCHAR".to_string()),
        ]
    );
    assert!(!store.path("ACME/snowduck_export/7/items_7.csv").exists());
}

#[test]
fn test_headerless_csv_export_uses_declared_names() {
    let staging = tempfile::tempdir().unwrap();
    let exporter =
        PostgresExporter::new(CannedCopy("1,alpha\n2,beta\n")).with_copy_options("FORMAT CSV");
    let items = Definition::remote(
        "items",
        "SELECT id, label FROM items",
        RemoteTable::new(Arc::new(exporter))
            .column("id", ColumnType::Int64)
            .column("label", ColumnType::Varchar),
    );
    let schema = Arc::new(Schema::new(vec![items]).unwrap());
    let mut session = Session::new(schema, DuckDbEngine::in_memory).with_remote(
        RemoteContext::new(
            Arc::new(LocalObjectStore::new(staging.path())),
            ExportSettings::for_account("ACME"),
        ),
    );

    session.ensure_materialized("items").unwrap();

    let rows = session
        .query_rows("SELECT id, label FROM items ORDER BY id")
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("id"), Some(&json!(1)));
    assert_eq!(rows[0].get_str("label"), Some("alpha"));
}

#[test]
fn test_missing_parquet_becomes_typed_empty_table() {
    let staging = tempfile::tempdir().unwrap();
    let events = Definition::remote(
        "events",
        "SELECT * FROM analytics.events WHERE 1 = 0",
        RemoteTable::new(Arc::new(NothingUnloaded))
            .column("event_id", ColumnType::Int32)
            .column("payload", ColumnType::Varchar),
    );
    let schema = Arc::new(Schema::new(vec![events]).unwrap());
    let mut session = Session::new(schema, DuckDbEngine::in_memory).with_remote(
        RemoteContext::new(
            Arc::new(LocalObjectStore::new(staging.path())),
            ExportSettings::for_account("ACME"),
        ),
    );

    session.ensure_materialized("events").unwrap();

    assert!(session.is_materialized("events"));
    assert!(session.query_rows("SELECT * FROM events").unwrap().is_empty());
    let engine = session.engine().unwrap();
    assert_eq!(
        column_types(engine, "events"),
        vec![
            ("event_id".to_string(), "INTEGER".to_string()),
            ("payload".to_string(), "VARCHAR".to_string()),
        ]
    );
}

#[test]
fn test_export_materialized_writes_tables_and_views() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("snapshot.duckdb");
    let mut session = Session::new(numbers_schema(), DuckDbEngine::in_memory);
    session.ensure_materialized("evens").unwrap();

    session.export_materialized(&destination).unwrap();

    let snapshot = DuckDbEngine::open(&destination, None).unwrap();
    let counts = snapshot
        .query_rows(
            "SELECT (SELECT count(*) FROM numbers) AS numbers, \
             (SELECT count(*) FROM evens) AS evens",
        )
        .unwrap();
    assert_eq!(counts[0].get("numbers"), Some(&json!(10)));
    assert_eq!(counts[0].get("evens"), Some(&json!(5)));

    // The export database is detached again.
    let attached = session
        .query_rows(
            "SELECT database_name FROM duckdb_databases() \
             WHERE database_name = 'snowduck_export'",
        )
        .unwrap();
    assert!(attached.is_empty());
}

#[test]
fn test_clear_all_empties_the_database() {
    let mut session = Session::new(numbers_schema(), DuckDbEngine::in_memory);
    session.ensure_materialized("evens").unwrap();
    session
        .engine()
        .unwrap()
        .execute_batch("CREATE TABLE scratch AS SELECT 1 AS x;")
        .unwrap();

    session.clear_all().unwrap();

    assert!(session.user_tables().unwrap().is_empty());
    assert!(session.user_views().unwrap().is_empty());
    assert_eq!(session.materialized().count(), 0);

    // Everything can be rebuilt afterwards.
    session.ensure_materialized("evens").unwrap();
    assert_eq!(session.query_rows("SELECT * FROM evens").unwrap().len(), 5);
}

#[test]
fn test_memory_info_is_available() {
    let mut session = Session::new(numbers_schema(), DuckDbEngine::in_memory);

    let rows = session.memory_info().unwrap();

    assert!(!rows.is_empty());
    assert!(rows[0].get("tag").is_some());
}

#[test]
fn test_session_from_settings_with_local_staging() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.export = ExportSettings::for_account("ACME");
    settings.export.local_dir = Some(dir.path().join("staging"));
    settings.session.database = Some(dir.path().join("local.duckdb"));

    let prices = Definition::remote(
        "prices",
        "SELECT sku, price FROM prices",
        RemoteTable::new(Arc::new(PostgresExporter::new(CannedCopy("sku,price\nA,1.5\n"))))
            .column("sku", ColumnType::Varchar)
            .column("price", ColumnType::Float64),
    );
    let schema = Arc::new(Schema::new(vec![prices]).unwrap());
    let mut session = Session::<DuckDbEngine>::from_settings(schema, &settings).unwrap();

    let rows = session
        .with_tables(&["prices"], |engine| engine.query_rows("SELECT price FROM prices"))
        .unwrap()
        .unwrap();

    assert_eq!(rows[0].get("price"), Some(&json!(1.5)));
    assert!(dir.path().join("local.duckdb").exists());
}
