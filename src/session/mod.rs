//! Dependency-ordered materialization into a live engine.
//!
//! A [`Session`] owns one engine handle and the set of table names it has
//! materialized so far. Requesting a table materializes its prerequisites
//! first, depth-first in declaration order, then the table itself:
//!
//! ```text
//! ensure_materialized(totals)
//!   ├─ ensure_materialized(orders)      remote: export ─► load ─► delete
//!   ├─ ensure_materialized(customers)   remote: export ─► load ─► delete
//!   └─ CREATE TABLE totals AS (...)
//! ```
//!
//! The membership check makes every request idempotent, so a prerequisite
//! shared by several tables is materialized once per session. The engine is
//! opened lazily on first use.

mod materialize;
mod observer;


pub use observer::{Observer, SessionEvent, TracingObserver};

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{ExportSettings, Settings, SettingsError, StorageConfig};
use crate::engine::{DuckDbEngine, Engine, EngineError, EngineResult, Row};
use crate::remote::{ExportError, LocalObjectStore, ObjectStore, StorageError};
use crate::schema::{Schema, SchemaError};
use crate::sql::statements;

/// Alias under which [`Session::export_materialized`] attaches its destination.
pub const EXPORT_ALIAS: &str = "snowduck_export";

const USER_TABLES: &str = "SELECT * FROM duckdb_tables() \
     WHERE NOT internal AND database_name = current_database() ORDER BY table_name;";
const USER_VIEWS: &str = "SELECT * FROM duckdb_views() \
     WHERE NOT internal AND database_name = current_database() ORDER BY view_name;";
const MEMORY_INFO: &str = "SELECT * FROM duckdb_memory();";

/// Errors raised by a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Unknown object type {0}; expected table, view, macro or function")]
    UnsupportedObjectKind(String),

    #[error("Failed to materialize {table}: {source}")]
    Materialization {
        table: String,
        #[source]
        source: MaterializationError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to open database: {0}")]
    Open(#[source] EngineError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Why a single definition could not be materialized.
#[derive(Debug, thiserror::Error)]
pub enum MaterializationError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("No object store configured for remote tables")]
    NoRemoteContext,

    #[error("Remote result was empty and no columns are declared")]
    NoDeclaredColumns,
}

/// Kinds of object [`Session::drop_object`] can remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Table,
    View,
    Macro,
    Function,
}

impl ObjectKind {
    /// SQL keyword used in `DROP` statements.
    pub fn keyword(self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::Macro => "MACRO",
            ObjectKind::Function => "FUNCTION",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keyword().to_lowercase())
    }
}

impl FromStr for ObjectKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(ObjectKind::Table),
            "view" => Ok(ObjectKind::View),
            "macro" => Ok(ObjectKind::Macro),
            "function" => Ok(ObjectKind::Function),
            _ => Err(SessionError::UnsupportedObjectKind(s.to_string())),
        }
    }
}

/// Where remote tables are staged and how their keys are named.
#[derive(Clone)]
pub struct RemoteContext {
    store: Arc<dyn ObjectStore>,
    export: ExportSettings,
}

impl RemoteContext {
    pub fn new(store: Arc<dyn ObjectStore>, export: ExportSettings) -> Self {
        Self { store, export }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn export(&self) -> &ExportSettings {
        &self.export
    }
}

impl fmt::Debug for RemoteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteContext")
            .field("export", &self.export)
            .finish_non_exhaustive()
    }
}

type Opener<E> = Box<dyn FnMut() -> EngineResult<E>>;

/// Materialization state for one engine handle.
pub struct Session<E: Engine> {
    schema: Arc<Schema>,
    opener: Opener<E>,
    engine: Option<E>,
    remote: Option<RemoteContext>,
    observer: Arc<dyn Observer>,
    materialized: BTreeSet<String>,
}

impl<E: Engine> Session<E> {
    /// Create a session that opens its engine with `opener` on first use.
    ///
    /// If opening fails, the next operation tries again.
    pub fn new<F>(schema: Arc<Schema>, opener: F) -> Self
    where
        F: FnMut() -> EngineResult<E> + 'static,
    {
        Self {
            schema,
            opener: Box::new(opener),
            engine: None,
            remote: None,
            observer: Arc::new(TracingObserver),
            materialized: BTreeSet::new(),
        }
    }

    /// Create a session over an engine that is already open.
    pub fn with_engine(schema: Arc<Schema>, engine: E) -> Self {
        let mut session = Self::new(schema, || {
            Err(EngineError::Query("engine handle was closed".to_string()))
        });
        session.engine = Some(engine);
        session
    }

    /// Stage remote tables through `remote`.
    pub fn with_remote(mut self, remote: RemoteContext) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Report progress to `observer` instead of `tracing`.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Materialize `name` and, before it, everything it depends on.
    pub fn ensure_materialized(&mut self, name: &str) -> SessionResult<()> {
        let schema = Arc::clone(&self.schema);
        let definition = schema.definition_for(name)?;

        if self.materialized.contains(name) {
            self.observer
                .on_event(&SessionEvent::AlreadyMaterialized { table: name });
            return Ok(());
        }

        for dependency in schema.dependencies_of(name)? {
            self.ensure_materialized(dependency.name())?;
        }

        let engine = open_engine(&mut self.engine, &mut self.opener, self.observer.as_ref())?;
        materialize::materialize(engine, definition, self.remote.as_ref(), self.observer.as_ref())
            .map_err(|source| SessionError::Materialization {
                table: name.to_string(),
                source,
            })?;

        self.materialized.insert(name.to_string());
        Ok(())
    }

    /// Materialize each of `names` in order.
    pub fn ensure_materialized_many<S: AsRef<str>>(&mut self, names: &[S]) -> SessionResult<()> {
        for name in names {
            self.ensure_materialized(name.as_ref())?;
        }
        Ok(())
    }

    /// Materialize `names`, then hand the engine to `f`.
    pub fn with_tables<S, F, R>(&mut self, names: &[S], f: F) -> SessionResult<R>
    where
        S: AsRef<str>,
        F: FnOnce(&E) -> R,
    {
        self.ensure_materialized_many(names)?;
        Ok(f(self.engine()?))
    }

    pub fn is_materialized(&self, name: &str) -> bool {
        self.materialized.contains(name)
    }

    /// Names materialized so far, sorted.
    pub fn materialized(&self) -> impl Iterator<Item = &str> {
        self.materialized.iter().map(String::as_str)
    }

    /// The engine, opening it if needed.
    pub fn engine(&mut self) -> SessionResult<&E> {
        open_engine(&mut self.engine, &mut self.opener, self.observer.as_ref())
    }

    /// Run a query against whatever exists right now.
    ///
    /// Nothing is materialized first; use [`Session::with_tables`] for that.
    pub fn query_rows(&mut self, sql: &str) -> SessionResult<Vec<Row>> {
        Ok(self.engine()?.query_rows(sql)?)
    }

    /// `DROP <kind> IF EXISTS name`, forgetting that `name` was materialized.
    pub fn drop_object(&mut self, name: &str, kind: ObjectKind) -> SessionResult<()> {
        self.engine()?
            .execute(&statements::drop_object(kind.keyword(), name))?;
        self.materialized.remove(name);
        self.observer.on_event(&SessionEvent::Dropped { name, kind });
        Ok(())
    }

    /// Like [`Session::drop_object`] with the kind given by name.
    pub fn drop_named(&mut self, name: &str, kind: &str) -> SessionResult<()> {
        let kind = kind.parse()?;
        self.drop_object(name, kind)
    }

    /// Drop every user table, then every user view.
    ///
    /// Objects are enumerated from the database itself, so objects created
    /// outside this session go too. Tables are dropped before the views that
    /// may read them, so this is best-effort cleanup and not transactional.
    pub fn clear_all(&mut self) -> SessionResult<()> {
        for name in self.object_names(USER_TABLES, "table_name")? {
            self.drop_object(&name, ObjectKind::Table)?;
        }
        for name in self.object_names(USER_VIEWS, "view_name")? {
            self.drop_object(&name, ObjectKind::View)?;
        }
        Ok(())
    }

    /// Copy every materialized table and view into the database file at
    /// `destination`, prerequisites first.
    ///
    /// Views are copied as tables holding their current rows. The destination
    /// is detached again even when a copy fails.
    pub fn export_materialized(&mut self, destination: impl AsRef<Path>) -> SessionResult<()> {
        let destination = destination.as_ref().display().to_string();
        let schema = Arc::clone(&self.schema);
        let engine = open_engine(&mut self.engine, &mut self.opener, self.observer.as_ref())?;

        engine.execute_batch(&statements::attach(&destination, EXPORT_ALIAS))?;

        let mut copied = HashSet::new();
        let copy_result = self.materialized.iter().try_for_each(|name| {
            copy_with_prerequisites(
                engine,
                &schema,
                &self.materialized,
                name,
                &mut copied,
                &destination,
                self.observer.as_ref(),
            )
        });
        let detach_result = engine.execute_batch(&statements::detach(EXPORT_ALIAS));

        copy_result?;
        detach_result?;
        Ok(())
    }

    /// Rows of `duckdb_tables()` for user tables.
    pub fn user_tables(&mut self) -> SessionResult<Vec<Row>> {
        self.query_rows(USER_TABLES)
    }

    /// Rows of `duckdb_views()` for user views.
    pub fn user_views(&mut self) -> SessionResult<Vec<Row>> {
        self.query_rows(USER_VIEWS)
    }

    /// Rows of `duckdb_memory()`.
    pub fn memory_info(&mut self) -> SessionResult<Vec<Row>> {
        self.query_rows(MEMORY_INFO)
    }

    /// Qualified object names from a catalog query; `main` is left implicit.
    fn object_names(&mut self, sql: &str, column: &str) -> SessionResult<Vec<String>> {
        let rows = self.query_rows(sql)?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.get_str(column)?;
                Some(match row.get_str("schema_name") {
                    Some(schema) if schema != "main" => format!("{}.{}", schema, name),
                    _ => name.to_string(),
                })
            })
            .collect())
    }
}

impl Session<DuckDbEngine> {
    /// Build a session from a settings file.
    ///
    /// The engine opens `[session].database`, or an in-memory database. With
    /// `[export].local_dir` set, remote tables are staged in that directory;
    /// otherwise, with the `s3` feature, they go through the configured bucket.
    pub fn from_settings(schema: Arc<Schema>, settings: &Settings) -> SessionResult<Self> {
        let database = settings.session.database.clone();

        if let Some(dir) = &settings.export.local_dir {
            let store = Arc::new(LocalObjectStore::new(dir));
            let session = Self::new(schema, move || open_duckdb(database.as_deref(), None));
            return Ok(session.with_remote(RemoteContext::new(store, settings.export.clone())));
        }

        bucket_session(schema, settings, database)
    }
}

#[cfg(feature = "s3")]
fn bucket_session(
    schema: Arc<Schema>,
    settings: &Settings,
    database: Option<PathBuf>,
) -> SessionResult<Session<DuckDbEngine>> {
    let storage = settings.storage_config()?;
    let store = Arc::new(crate::remote::S3ObjectStore::new(&storage)?);
    let session = Session::new(schema, move || {
        open_duckdb(database.as_deref(), Some(&storage))
    });
    Ok(session.with_remote(RemoteContext::new(store, settings.export.clone())))
}

#[cfg(not(feature = "s3"))]
fn bucket_session(
    schema: Arc<Schema>,
    _settings: &Settings,
    database: Option<PathBuf>,
) -> SessionResult<Session<DuckDbEngine>> {
    Ok(Session::new(schema, move || open_duckdb(database.as_deref(), None)))
}

fn open_duckdb(path: Option<&Path>, storage: Option<&StorageConfig>) -> EngineResult<DuckDbEngine> {
    match (path, storage) {
        (Some(path), storage) => DuckDbEngine::open(path, storage),
        (None, Some(storage)) => DuckDbEngine::in_memory_with_storage(storage),
        (None, None) => DuckDbEngine::in_memory(),
    }
}

impl<E: Engine> fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("open", &self.engine.is_some())
            .field("remote", &self.remote)
            .field("materialized", &self.materialized)
            .finish_non_exhaustive()
    }
}

fn open_engine<'a, E: Engine>(
    slot: &'a mut Option<E>,
    opener: &mut Opener<E>,
    observer: &dyn Observer,
) -> SessionResult<&'a E> {
    let engine = match slot.take() {
        Some(engine) => engine,
        None => {
            let engine = opener().map_err(SessionError::Open)?;
            observer.on_event(&SessionEvent::EngineOpened);
            engine
        }
    };
    Ok(slot.insert(engine))
}

/// Copy `name` into the export database after its materialized prerequisites.
fn copy_with_prerequisites<E: Engine>(
    engine: &E,
    schema: &Schema,
    materialized: &BTreeSet<String>,
    name: &str,
    copied: &mut HashSet<String>,
    destination: &str,
    observer: &dyn Observer,
) -> SessionResult<()> {
    for dependency in schema.dependencies_of(name)? {
        if materialized.contains(dependency.name()) {
            copy_with_prerequisites(
                engine,
                schema,
                materialized,
                dependency.name(),
                copied,
                destination,
                observer,
            )?;
        }
    }

    if !copied.insert(name.to_string()) {
        observer.on_event(&SessionEvent::AlreadyCopied { table: name });
        return Ok(());
    }
    engine.execute_batch(&statements::copy_into_attached(EXPORT_ALIAS, name))?;
    observer.on_event(&SessionEvent::Copied {
        table: name,
        destination,
    });
    Ok(())
}
