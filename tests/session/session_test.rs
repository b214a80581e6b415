// tests/session/session_test.rs
//
// Session behavior through the public API, against an engine that only
// records what it is asked to run.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use snowduck::engine::{Engine, EngineError, EngineResult, Row};
use snowduck::schema::{Definition, Schema};
use snowduck::session::{MaterializationError, ObjectKind, Session, SessionError};

#[derive(Clone, Default)]
struct RecordingEngine {
    statements: Rc<RefCell<Vec<String>>>,
    fail_on: Rc<RefCell<Option<String>>>,
}

impl RecordingEngine {
    fn record(&self, sql: &str) -> EngineResult<()> {
        self.statements.borrow_mut().push(sql.to_string());
        match self.fail_on.borrow().as_deref() {
            Some(needle) if sql.contains(needle) => {
                Err(EngineError::Query(format!("Catalog Error: {}", needle)))
            }
            _ => Ok(()),
        }
    }

    fn created(&self) -> Vec<String> {
        self.statements
            .borrow()
            .iter()
            .filter(|s| s.starts_with("CREATE"))
            .cloned()
            .collect()
    }
}

impl Engine for RecordingEngine {
    fn execute(&self, sql: &str) -> EngineResult<usize> {
        self.record(sql).map(|_| 0)
    }

    fn execute_batch(&self, sql: &str) -> EngineResult<()> {
        self.record(sql)
    }

    fn query_rows(&self, sql: &str) -> EngineResult<Vec<Row>> {
        self.record(sql).map(|_| Vec::new())
    }
}

/// staging ─► cleaned ─► summary
///                 └────► v_cleaned
fn reporting_schema() -> Arc<Schema> {
    let staging = Definition::derived("staging", "SELECT * FROM range(100)", vec![]);
    let cleaned = Definition::derived(
        "cleaned",
        "SELECT range AS id FROM staging WHERE range % 3 = 0",
        vec![staging],
    );
    let summary = Definition::derived(
        "summary",
        "SELECT count(*) AS n FROM cleaned",
        vec![cleaned.clone()],
    );
    let view = Definition::view("v_cleaned", "SELECT * FROM cleaned", vec![cleaned]);
    Arc::new(Schema::new(vec![summary, view]).unwrap())
}

#[test]
fn test_requesting_two_reports_builds_shared_chain_once() {
    let engine = RecordingEngine::default();
    let mut session = Session::with_engine(reporting_schema(), engine.clone());

    session
        .ensure_materialized_many(&["summary", "v_cleaned"])
        .unwrap();

    assert_eq!(
        engine.created(),
        vec![
            "CREATE TABLE staging AS (SELECT * FROM range(100));",
            "CREATE TABLE cleaned AS (SELECT range AS id FROM staging WHERE range % 3 = 0);",
            "CREATE TABLE summary AS (SELECT count(*) AS n FROM cleaned);",
            "CREATE OR REPLACE VIEW v_cleaned AS (SELECT * FROM cleaned);",
        ]
    );
    assert_eq!(
        session.materialized().collect::<Vec<_>>(),
        vec!["cleaned", "staging", "summary", "v_cleaned"]
    );
}

#[test]
fn test_failed_prerequisite_stops_the_chain() {
    let engine = RecordingEngine::default();
    *engine.fail_on.borrow_mut() = Some("CREATE TABLE cleaned".to_string());
    let mut session = Session::with_engine(reporting_schema(), engine.clone());

    let err = session.ensure_materialized("summary").unwrap_err();

    match err {
        SessionError::Materialization { table, source } => {
            assert_eq!(table, "cleaned");
            assert!(matches!(source, MaterializationError::Engine(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(session.is_materialized("staging"));
    assert!(!session.is_materialized("cleaned"));
    assert!(!engine.created().iter().any(|s| s.contains("summary")));

    // Once the fault clears, only the missing part of the chain is built.
    *engine.fail_on.borrow_mut() = None;
    engine.statements.borrow_mut().clear();
    session.ensure_materialized("summary").unwrap();
    assert_eq!(engine.created().len(), 2);
}

#[test]
fn test_opener_runs_once_on_first_use() {
    let engine = RecordingEngine::default();
    let opened = Rc::new(RefCell::new(0));
    let mut session = {
        let engine = engine.clone();
        let opened = Rc::clone(&opened);
        Session::new(reporting_schema(), move || {
            *opened.borrow_mut() += 1;
            Ok(engine.clone())
        })
    };

    assert_eq!(*opened.borrow(), 0);
    session.ensure_materialized("summary").unwrap();
    session.ensure_materialized("v_cleaned").unwrap();
    session.query_rows("SELECT * FROM summary").unwrap();

    assert_eq!(*opened.borrow(), 1);
}

#[test]
fn test_dropping_a_view_allows_rebuild() {
    let engine = RecordingEngine::default();
    let mut session = Session::with_engine(reporting_schema(), engine.clone());
    session.ensure_materialized("v_cleaned").unwrap();

    session.drop_named("v_cleaned", "VIEW").unwrap();
    assert!(!session.is_materialized("v_cleaned"));
    assert!(session.is_materialized("cleaned"));

    session.ensure_materialized("v_cleaned").unwrap();
    let statements = engine.statements.borrow().clone();
    assert!(statements.contains(&"DROP VIEW IF EXISTS v_cleaned;".to_string()));
    assert_eq!(
        statements
            .iter()
            .filter(|s| s.contains("VIEW v_cleaned AS"))
            .count(),
        2
    );
}

#[test]
fn test_unsupported_drop_kind() {
    let mut session = Session::with_engine(reporting_schema(), RecordingEngine::default());

    let err = session.drop_named("staging", "sequence").unwrap_err();

    assert!(matches!(err, SessionError::UnsupportedObjectKind(ref kind) if kind == "sequence"));
    assert_eq!("Macro".parse::<ObjectKind>().unwrap(), ObjectKind::Macro);
}

#[test]
fn test_unknown_table_is_reported_before_opening() {
    let mut session: Session<RecordingEngine> = Session::new(reporting_schema(), || {
        Err(EngineError::Query("should not open".to_string()))
    });

    let err = session.ensure_materialized("nope").unwrap_err();

    assert!(matches!(err, SessionError::Schema(_)));
    assert_eq!(err.to_string(), "Unknown table nope");
}
