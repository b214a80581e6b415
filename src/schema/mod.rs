//! Dependency resolution over table definitions.
//!
//! A [`Schema`] turns a list of [`Definition`]s into a validated dependency
//! graph:
//!
//! ```text
//! definitions ──► collect (depth-first) ──► group by name ──► vertices ──► edges
//!                                              │                             │
//!                                    AmbiguousDefinition          UnknownDependency / Graph
//! ```
//!
//! Every definition reachable through `depends_on` takes part, even if the
//! caller only listed its dependents. Once built, a schema never changes.

mod definition;


pub use definition::{Definition, DefinitionKind, RemoteTable};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::format::Formatter;
use crate::graph::{Dag, GraphError, Vertex};

/// Errors raised while building or querying a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("At least one table definition is required")]
    EmptyDefinitionSet,

    #[error(
        "Table(s) {tables:?} have multiple different queries; give each variant its own table name"
    )]
    AmbiguousDefinition { tables: Vec<String> },

    #[error("Dependency {dependency} for table {table} is not in the tables list")]
    UnknownDependency { table: String, dependency: String },

    #[error("Unknown table {0}")]
    UnknownTable(String),

    #[error("Invalid dependency of {table} on {dependency}: {source}")]
    Graph {
        table: String,
        dependency: String,
        #[source]
        source: GraphError,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// An immutable, validated set of definitions and their dependency graph.
#[derive(Debug)]
pub struct Schema {
    graph: Dag<String>,
    definitions: Vec<Arc<Definition>>,
    by_name: HashMap<String, Arc<Definition>>,
    vertices: HashMap<String, Vertex>,
}

impl Schema {
    /// Validate `definitions` and build their dependency graph.
    pub fn new(definitions: Vec<Arc<Definition>>) -> SchemaResult<Self> {
        if definitions.is_empty() {
            return Err(SchemaError::EmptyDefinitionSet);
        }

        let mut collected = Vec::new();
        collect(&definitions, &mut HashSet::new(), &mut collected);
        check_ambiguity(&collected)?;

        let mut by_name: HashMap<String, Arc<Definition>> = HashMap::new();
        for definition in definitions.iter().chain(collected.iter()) {
            by_name
                .entry(definition.name().to_string())
                .or_insert_with(|| Arc::clone(definition));
        }

        // Depth-first collection puts every dependency before its dependents.
        let mut graph = Dag::new();
        let mut vertices = HashMap::new();
        for definition in &collected {
            vertices
                .entry(definition.name().to_string())
                .or_insert_with(|| graph.add_vertex(definition.name().to_string()));
        }

        let mut linked = BTreeSet::new();
        for definition in &collected {
            let table = definition.name();
            for dependency in definition.depends_on() {
                let dependency = dependency.name();
                let (Some(&from), Some(&to)) = (vertices.get(dependency), vertices.get(table))
                else {
                    return Err(SchemaError::UnknownDependency {
                        table: table.to_string(),
                        dependency: dependency.to_string(),
                    });
                };
                if !linked.insert((from, to)) {
                    continue;
                }
                graph.add_edge(from, to).map_err(|source| SchemaError::Graph {
                    table: table.to_string(),
                    dependency: dependency.to_string(),
                    source,
                })?;
            }
        }

        tracing::debug!(
            tables = graph.vertex_count(),
            dependencies = graph.edge_count(),
            "built schema"
        );

        Ok(Self {
            graph,
            definitions,
            by_name,
            vertices,
        })
    }

    /// The definition registered under `name`.
    pub fn definition_for(&self, name: &str) -> SchemaResult<&Arc<Definition>> {
        self.by_name
            .get(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    /// Every definition `name` depends on, directly or transitively.
    pub fn ancestors_of(&self, name: &str) -> SchemaResult<Vec<Arc<Definition>>> {
        let vertex = self.vertex(name)?;
        let ancestors = self.graph.ancestors(vertex).map_err(|e| graph_error(name, e))?;
        self.resolve(&ancestors)
    }

    /// Direct prerequisites of `name`, in declaration order.
    pub fn dependencies_of(&self, name: &str) -> SchemaResult<Vec<Arc<Definition>>> {
        let vertex = self.vertex(name)?;
        let predecessors = self
            .graph
            .predecessors(vertex)
            .map_err(|e| graph_error(name, e))?;
        self.resolve(&predecessors)
    }

    /// Every definition that depends on `name`, directly or transitively.
    pub fn dependents_of(&self, name: &str) -> SchemaResult<Vec<Arc<Definition>>> {
        let vertex = self.vertex(name)?;
        let descendants = self
            .graph
            .descendants(vertex)
            .map_err(|e| graph_error(name, e))?;
        self.resolve(&descendants)
    }

    /// Definitions as supplied by the caller.
    pub fn definitions(&self) -> &[Arc<Definition>] {
        &self.definitions
    }

    /// Names of every table in the graph, dependencies first.
    pub fn table_names(&self) -> Vec<&str> {
        self.graph
            .vertices()
            .filter_map(|v| self.graph.payload(v))
            .map(String::as_str)
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vertices.contains_key(name)
    }

    pub fn graph(&self) -> &Dag<String> {
        &self.graph
    }

    /// The schema restricted to `names` and everything they depend on.
    pub fn subschema(&self, names: &[&str]) -> SchemaResult<Schema> {
        let roots = names
            .iter()
            .map(|name| self.vertex(name))
            .collect::<SchemaResult<Vec<_>>>()?;
        let graph = self
            .graph
            .subgraph(&roots, &[])
            .map_err(|e| graph_error(&names.join(", "), e))?;

        let mut vertices = HashMap::new();
        let mut by_name = HashMap::new();
        for vertex in graph.vertices() {
            if let Some(name) = graph.payload(vertex) {
                vertices.insert(name.clone(), vertex);
                by_name.insert(name.clone(), Arc::clone(self.definition_for(name)?));
            }
        }

        let mut definitions: Vec<Arc<Definition>> = Vec::new();
        for name in names {
            let definition = self.definition_for(name)?;
            if !definitions.iter().any(|d| d.name() == definition.name()) {
                definitions.push(Arc::clone(definition));
            }
        }

        Ok(Schema {
            graph,
            definitions,
            by_name,
            vertices,
        })
    }

    /// Render the schema with `formatter`.
    pub fn pretty_print(&self, formatter: &dyn Formatter) -> String {
        formatter.format(self)
    }

    fn vertex(&self, name: &str) -> SchemaResult<Vertex> {
        self.vertices
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    fn resolve(&self, vertices: &[Vertex]) -> SchemaResult<Vec<Arc<Definition>>> {
        vertices
            .iter()
            .filter_map(|&v| self.graph.payload(v))
            .map(|name| self.definition_for(name).map(Arc::clone))
            .collect()
    }
}

fn graph_error(name: &str, source: GraphError) -> SchemaError {
    SchemaError::Graph {
        table: name.to_string(),
        dependency: String::new(),
        source,
    }
}

/// Depth-first walk: dependencies are pushed before their dependents.
/// Shared definitions are visited once.
fn collect(
    definitions: &[Arc<Definition>],
    seen: &mut HashSet<*const Definition>,
    out: &mut Vec<Arc<Definition>>,
) {
    for definition in definitions {
        if !seen.insert(Arc::as_ptr(definition)) {
            continue;
        }
        collect(definition.depends_on(), seen, out);
        out.push(Arc::clone(definition));
    }
}

fn check_ambiguity(collected: &[Arc<Definition>]) -> SchemaResult<()> {
    let mut queries: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for definition in collected {
        queries
            .entry(definition.name())
            .or_default()
            .insert(definition.query());
    }

    let tables: Vec<String> = queries
        .into_iter()
        .filter(|(_, distinct)| distinct.len() > 1)
        .map(|(name, _)| name.to_string())
        .collect();

    if tables.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::AmbiguousDefinition { tables })
    }
}
