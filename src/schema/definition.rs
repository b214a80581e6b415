//! Table and view definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::remote::{Exporter, FileFormat};
use crate::sql::{ColumnDef, ColumnType};

/// A named table or view and how to materialize it.
///
/// Definitions reference their prerequisites directly, so a schema can be
/// built from just the tables a caller wants; everything they depend on is
/// discovered by walking `depends_on`.
#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    query: String,
    kind: DefinitionKind,
}

/// How a definition is materialized.
#[derive(Debug, Clone)]
pub enum DefinitionKind {
    /// Exported from a remote system, staged in object storage, then loaded.
    Remote(RemoteTable),

    /// `CREATE TABLE name AS (query)` over local tables.
    Derived { depends_on: Vec<Arc<Definition>> },

    /// `CREATE OR REPLACE VIEW name AS (query)` over local tables.
    View { depends_on: Vec<Arc<Definition>> },
}

impl Definition {
    pub fn remote(
        name: impl Into<String>,
        query: impl Into<String>,
        table: RemoteTable,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            query: query.into(),
            kind: DefinitionKind::Remote(table),
        })
    }

    pub fn derived(
        name: impl Into<String>,
        query: impl Into<String>,
        depends_on: Vec<Arc<Definition>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            query: query.into(),
            kind: DefinitionKind::Derived { depends_on },
        })
    }

    pub fn view(
        name: impl Into<String>,
        query: impl Into<String>,
        depends_on: Vec<Arc<Definition>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            query: query.into(),
            kind: DefinitionKind::View { depends_on },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query that produces the definition's rows.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn kind(&self) -> &DefinitionKind {
        &self.kind
    }

    /// Direct prerequisites, in declaration order. Empty for remote tables.
    pub fn depends_on(&self) -> &[Arc<Definition>] {
        match &self.kind {
            DefinitionKind::Remote(_) => &[],
            DefinitionKind::Derived { depends_on } | DefinitionKind::View { depends_on } => {
                depends_on
            }
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self.kind, DefinitionKind::View { .. })
    }

    pub fn remote_table(&self) -> Option<&RemoteTable> {
        match &self.kind {
            DefinitionKind::Remote(table) => Some(table),
            _ => None,
        }
    }
}

/// Remote source of a table.
#[derive(Clone)]
pub struct RemoteTable {
    exporter: Arc<dyn Exporter>,
    columns: Vec<ColumnDef>,
    params: BTreeMap<String, String>,
    instance: Option<String>,
}

impl RemoteTable {
    pub fn new(exporter: Arc<dyn Exporter>) -> Self {
        Self {
            exporter,
            columns: Vec::new(),
            params: BTreeMap::new(),
            instance: None,
        }
    }

    /// Declare a column. Declared columns type CSV loads and empty tables.
    pub fn column(mut self, name: impl Into<String>, data_type: ColumnType) -> Self {
        self.columns.push(ColumnDef::new(name, data_type));
        self
    }

    /// Record an instantiation parameter. Parameters feed the export key.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the instance discriminator used in the export key instead of the
    /// parameter hash.
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn exporter(&self) -> &dyn Exporter {
        self.exporter.as_ref()
    }

    pub fn format(&self) -> FileFormat {
        self.exporter.format()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance.as_deref()
    }
}

impl fmt::Debug for RemoteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTable")
            .field("format", &self.format())
            .field("columns", &self.columns)
            .field("params", &self.params)
            .field("instance", &self.instance)
            .finish()
    }
}
