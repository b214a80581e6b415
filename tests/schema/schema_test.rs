// tests/schema/schema_test.rs
use std::sync::Arc;

use snowduck::remote::{ExportRequest, ExportResult, Exporter, FileFormat, ObjectStore};
use snowduck::schema::{Definition, RemoteTable, Schema, SchemaError};
use snowduck::sql::ColumnType;

struct CsvExporter;

impl Exporter for CsvExporter {
    fn format(&self) -> FileFormat {
        FileFormat::Csv
    }

    fn export(&self, _request: &ExportRequest<'_>, _store: &dyn ObjectStore) -> ExportResult<()> {
        Ok(())
    }
}

fn remote(name: &str) -> Arc<Definition> {
    Definition::remote(
        name,
        format!("SELECT * FROM public.{}", name),
        RemoteTable::new(Arc::new(CsvExporter))
            .column("id", ColumnType::Int64)
            .column("updated_at", ColumnType::Timestamp),
    )
}

fn names(definitions: &[Arc<Definition>]) -> Vec<&str> {
    definitions.iter().map(|d| d.name()).collect()
}

/// `orders`, `customers` ─► `enriched_orders` ─► `v_orders`
///                          `orders` ─► `order_counts`
fn warehouse() -> Schema {
    let orders = remote("orders");
    let customers = remote("customers");
    let enriched = Definition::derived(
        "enriched_orders",
        "SELECT * FROM orders JOIN customers USING (customer_id)",
        vec![orders.clone(), customers],
    );
    let view = Definition::view("v_orders", "SELECT * FROM enriched_orders", vec![enriched]);
    let counts = Definition::derived(
        "order_counts",
        "SELECT count(*) AS n FROM orders",
        vec![orders],
    );
    Schema::new(vec![view, counts]).unwrap()
}

#[test]
fn test_collects_every_reachable_definition() {
    let schema = warehouse();

    assert_eq!(
        schema.table_names(),
        vec!["orders", "customers", "enriched_orders", "v_orders", "order_counts"]
    );
    assert_eq!(names(schema.definitions()), vec!["v_orders", "order_counts"]);
    assert_eq!(schema.graph().vertex_count(), 5);
    assert_eq!(schema.graph().edge_count(), 4);
}

#[test]
fn test_lineage_queries() {
    let schema = warehouse();

    assert_eq!(
        names(&schema.ancestors_of("v_orders").unwrap()),
        vec!["enriched_orders", "orders", "customers"]
    );
    assert_eq!(
        names(&schema.dependents_of("orders").unwrap()),
        vec!["enriched_orders", "v_orders", "order_counts"]
    );
    assert_eq!(
        names(&schema.dependencies_of("enriched_orders").unwrap()),
        vec!["orders", "customers"]
    );
}

#[test]
fn test_remote_definition_details() {
    let schema = warehouse();

    let orders = schema.definition_for("orders").unwrap();
    let table = orders.remote_table().unwrap();
    assert_eq!(table.format(), FileFormat::Csv);
    assert_eq!(table.columns()[1].name, "updated_at");
    assert_eq!(table.columns()[1].data_type, ColumnType::Timestamp);
    assert!(schema.definition_for("v_orders").unwrap().is_view());
}

#[test]
fn test_conflicting_queries_for_one_name() {
    let first = Definition::derived("orders", "SELECT 1 AS id", vec![]);
    let second = Definition::derived("orders", "SELECT 2 AS id", vec![]);
    let report = Definition::derived("report", "SELECT * FROM orders", vec![second]);

    let err = Schema::new(vec![first, report]).unwrap_err();

    assert_eq!(
        err,
        SchemaError::AmbiguousDefinition {
            tables: vec!["orders".to_string()]
        }
    );
    assert!(err.to_string().contains("orders"));
}

#[test]
fn test_subschema_for_one_report() {
    let schema = warehouse();

    let sub = schema.subschema(&["order_counts"]).unwrap();

    assert_eq!(sub.table_names(), vec!["orders", "order_counts"]);
    assert!(sub.ancestors_of("order_counts").is_ok());
    assert_eq!(
        sub.ancestors_of("v_orders").unwrap_err(),
        SchemaError::UnknownTable("v_orders".to_string())
    );
}

#[test]
fn test_subschema_of_unknown_table() {
    let schema = warehouse();

    assert_eq!(
        schema.subschema(&["missing"]).unwrap_err(),
        SchemaError::UnknownTable("missing".to_string())
    );
}
