//! Directed acyclic graph over arbitrary payloads.
//!
//! Vertices live in a `petgraph` arena and are addressed through copyable
//! [`Vertex`] handles. Every handle remembers which graph created it, so a
//! vertex from one graph is rejected by another instead of silently aliasing
//! an unrelated node.
//!
//! Acyclicity is checked on every [`Dag::add_edge`] call. A rejected edge
//! leaves the graph untouched, so the graph is never observable in a cyclic
//! state.

mod query;


use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Errors raised by graph mutations and queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Vertex {0} is not part of this graph")]
    UnknownVertex(Vertex),

    #[error("Edge from {from} to {to} already exists")]
    DuplicateEdge { from: Vertex, to: Vertex },

    #[error("Edge from {from} to {to} would create a cycle")]
    CycleDetected { from: Vertex, to: Vertex },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Handle to a vertex owned by a [`Dag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vertex {
    graph: u64,
    index: NodeIndex,
}

impl Vertex {
    /// Position of the vertex in its graph's arena (insertion order).
    pub fn index(&self) -> usize {
        self.index.index()
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.index.index())
    }
}

/// A directed acyclic graph.
///
/// Edges point from a prerequisite to the vertex that depends on it.
#[derive(Debug)]
pub struct Dag<T> {
    id: u64,
    graph: DiGraph<T, ()>,
}

impl<T> Dag<T> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            graph: DiGraph::new(),
        }
    }

    /// Append a vertex carrying `payload`.
    pub fn add_vertex(&mut self, payload: T) -> Vertex {
        let index = self.graph.add_node(payload);
        self.handle(index)
    }

    /// Add an edge from `from` (prerequisite) to `to` (dependent).
    ///
    /// Rejects foreign vertices, duplicate edges, self-loops and any edge that
    /// would close a cycle. On error the graph is unchanged.
    pub fn add_edge(&mut self, from: Vertex, to: Vertex) -> GraphResult<()> {
        let origin = self.index_of(from)?;
        let destination = self.index_of(to)?;

        if self.graph.contains_edge(origin, destination) {
            return Err(GraphError::DuplicateEdge { from, to });
        }
        if origin == destination || self.reaches(destination, origin) {
            return Err(GraphError::CycleDetected { from, to });
        }

        self.graph.add_edge(origin, destination, ());
        Ok(())
    }

    /// Payload stored on `vertex`, if it belongs to this graph.
    pub fn payload(&self, vertex: Vertex) -> Option<&T> {
        self.index_of(vertex)
            .ok()
            .and_then(|index| self.graph.node_weight(index))
    }

    /// First vertex whose payload equals `payload`.
    pub fn position(&self, payload: &T) -> Option<Vertex>
    where
        T: PartialEq,
    {
        self.graph
            .node_indices()
            .find(|&index| &self.graph[index] == payload)
            .map(|index| self.handle(index))
    }

    /// All vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.graph.node_indices().map(|index| self.handle(index))
    }

    /// All edges as `(from, to)` pairs in insertion order.
    pub fn edges(&self) -> Vec<(Vertex, Vertex)> {
        self.graph
            .edge_references()
            .map(|edge| (self.handle(edge.source()), self.handle(edge.target())))
            .collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn handle(&self, index: NodeIndex) -> Vertex {
        Vertex {
            graph: self.id,
            index,
        }
    }

    fn index_of(&self, vertex: Vertex) -> GraphResult<NodeIndex> {
        if vertex.graph != self.id || vertex.index.index() >= self.graph.node_count() {
            return Err(GraphError::UnknownVertex(vertex));
        }
        Ok(vertex.index)
    }
}

impl<T> Default for Dag<T> {
    fn default() -> Self {
        Self::new()
    }
}
