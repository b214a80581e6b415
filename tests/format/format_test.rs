// tests/format/format_test.rs
use std::sync::Arc;

use insta::assert_snapshot;
use snowduck::format::{Formatter, MermaidFormatter, TextFormatter};
use snowduck::schema::{Definition, Schema};

/// `seed` ─► `stage.orders` ─► `order-report`
///   └───────────────────────────┘
fn schema() -> Schema {
    let seed = Definition::derived("seed", "SELECT 1 AS id", vec![]);
    let orders = Definition::derived("stage.orders", "SELECT * FROM seed", vec![seed.clone()]);
    let report = Definition::view(
        "order-report",
        "SELECT * FROM stage.orders JOIN seed USING (id)",
        vec![orders, seed.clone()],
    );
    Schema::new(vec![seed, report]).unwrap()
}

#[test]
fn test_text_listing() {
    let output = schema().pretty_print(&TextFormatter);

    assert_snapshot!(output, @r"
    Table Dependencies:

    seed has no dependencies.
    order-report depends on: stage.orders, seed
    ");
}

#[test]
fn test_mermaid_levels_and_edges() {
    let output = MermaidFormatter.format(&schema());

    assert!(output.starts_with("---\nconfig:\n  layout: elk\n"));
    let body = output
        .split_once("graph LR\n")
        .map(|(_, body)| body)
        .unwrap();
    assert_eq!(
        body,
        "  subgraph Level1\n\
         \x20   seed[seed]\n\
         \x20 end\n\
         \x20 subgraph Level2\n\
         \x20   stage_orders[stage_orders]\n\
         \x20 end\n\
         \x20 subgraph Level3\n\
         \x20   order_report[order_report]\n\
         \x20 end\n\
         \x20 seed --> stage_orders\n\
         \x20 stage_orders --> order_report\n\
         \x20 seed --> order_report\n"
    );
}

#[test]
fn test_formatters_are_interchangeable() {
    let schema = schema();
    let formatters: Vec<Arc<dyn Formatter>> =
        vec![Arc::new(TextFormatter), Arc::new(MermaidFormatter)];

    for formatter in formatters {
        let output = schema.pretty_print(formatter.as_ref());
        assert!(output.contains("seed"));
    }
}
