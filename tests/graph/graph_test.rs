// tests/graph/graph_test.rs
use snowduck::graph::{Dag, GraphError, Vertex};

/// A small warehouse pipeline:
///
/// raw_orders ─► orders ─► daily_revenue ─► revenue_report
/// raw_customers ─► customers ─┘
fn pipeline() -> (Dag<String>, Vec<Vertex>) {
    let mut dag = Dag::new();
    let names = [
        "raw_orders",
        "raw_customers",
        "orders",
        "customers",
        "daily_revenue",
        "revenue_report",
    ];
    let v: Vec<Vertex> = names.iter().map(|n| dag.add_vertex(n.to_string())).collect();

    dag.add_edge(v[0], v[2]).unwrap();
    dag.add_edge(v[1], v[3]).unwrap();
    dag.add_edge(v[2], v[4]).unwrap();
    dag.add_edge(v[3], v[4]).unwrap();
    dag.add_edge(v[4], v[5]).unwrap();
    (dag, v)
}

fn names(dag: &Dag<String>, vertices: &[Vertex]) -> Vec<String> {
    vertices
        .iter()
        .map(|&v| dag.payload(v).cloned().unwrap())
        .collect()
}

#[test]
fn test_pipeline_levels() {
    let (dag, _) = pipeline();

    let levels: Vec<(usize, Vec<String>)> = dag
        .topological_levels()
        .into_iter()
        .map(|(level, vertices)| (level, names(&dag, &vertices)))
        .collect();

    assert_eq!(
        levels,
        vec![
            (1, vec!["raw_orders".to_string(), "raw_customers".to_string()]),
            (2, vec!["orders".to_string(), "customers".to_string()]),
            (3, vec!["daily_revenue".to_string()]),
            (4, vec!["revenue_report".to_string()]),
        ]
    );
}

#[test]
fn test_closing_the_loop_is_rejected() {
    let (mut dag, v) = pipeline();

    let err = dag.add_edge(v[5], v[0]).unwrap_err();

    assert_eq!(err, GraphError::CycleDetected { from: v[5], to: v[0] });
    assert_eq!(dag.edge_count(), 5);
    assert!(!dag.path_exists(v[5], v[0]).unwrap());
}

#[test]
fn test_report_lineage() {
    let (dag, v) = pipeline();

    let upstream = dag.ancestors(v[5]).unwrap();
    assert_eq!(upstream.len(), 5);
    assert!(!upstream.contains(&v[5]));

    let downstream = dag.descendants(v[1]).unwrap();
    assert_eq!(
        names(&dag, &downstream),
        vec!["customers", "daily_revenue", "revenue_report"]
    );
}

#[test]
fn test_subgraph_around_join() {
    let (dag, v) = pipeline();

    let sub = dag.subgraph(&[v[2]], &[v[3]]).unwrap();

    let mut kept = names(&sub, &sub.vertices().collect::<Vec<_>>());
    kept.sort();
    assert_eq!(
        kept,
        vec!["customers", "daily_revenue", "orders", "raw_orders", "revenue_report"]
    );
    // raw_orders -> orders, customers -> daily_revenue, daily_revenue -> revenue_report
    assert_eq!(sub.edge_count(), 3);
    assert_eq!(dag.vertex_count(), 6);
}

#[test]
fn test_vertices_do_not_cross_graphs() {
    let (dag, _) = pipeline();
    let mut other = Dag::new();
    let stranger = other.add_vertex("stranger".to_string());

    assert_eq!(
        dag.predecessors(stranger),
        Err(GraphError::UnknownVertex(stranger))
    );
    assert!(dag.payload(stranger).is_none());
}
