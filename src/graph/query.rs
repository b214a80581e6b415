//! Traversal queries over a [`Dag`].
//!
//! All transitive walks keep a visited set, so shared ancestors in diamond
//! shapes are expanded once and every query is linear in the size of the
//! subgraph it touches.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::NodeIndex;
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;

use super::{Dag, GraphResult, Vertex};

impl<T> Dag<T> {
    /// Direct prerequisites of `vertex`, in edge insertion order.
    pub fn predecessors(&self, vertex: Vertex) -> GraphResult<Vec<Vertex>> {
        let index = self.index_of(vertex)?;
        Ok(self.neighbors(index, Direction::Incoming))
    }

    /// Direct dependents of `vertex`, in edge insertion order.
    pub fn successors(&self, vertex: Vertex) -> GraphResult<Vec<Vertex>> {
        let index = self.index_of(vertex)?;
        Ok(self.neighbors(index, Direction::Outgoing))
    }

    /// Every vertex `vertex` depends on, directly or transitively.
    ///
    /// The result never contains `vertex` itself. Order is depth-first
    /// discovery order, starting from the earliest declared prerequisite.
    pub fn ancestors(&self, vertex: Vertex) -> GraphResult<Vec<Vertex>> {
        let index = self.index_of(vertex)?;
        Ok(self.closure(index, Direction::Incoming))
    }

    /// Every vertex that depends on `vertex`, directly or transitively.
    pub fn descendants(&self, vertex: Vertex) -> GraphResult<Vec<Vertex>> {
        let index = self.index_of(vertex)?;
        Ok(self.closure(index, Direction::Outgoing))
    }

    /// True iff `to` is reachable from `from` by following at least one edge.
    pub fn path_exists(&self, from: Vertex, to: Vertex) -> GraphResult<bool> {
        let origin = self.index_of(from)?;
        let destination = self.index_of(to)?;
        Ok(self.reaches(origin, destination))
    }

    /// Group vertices by dependency depth.
    ///
    /// A vertex without predecessors sits on level 1; any other vertex sits one
    /// level above its deepest predecessor. Levels are returned in ascending
    /// order, vertices within a level in insertion order.
    pub fn topological_levels(&self) -> Vec<(usize, Vec<Vertex>)> {
        let mut memo: HashMap<NodeIndex, usize> = HashMap::new();
        let mut levels: BTreeMap<usize, Vec<Vertex>> = BTreeMap::new();

        for index in self.graph.node_indices() {
            let level = self.level_of(index, &mut memo);
            levels.entry(level).or_default().push(self.handle(index));
        }

        levels.into_iter().collect()
    }

    /// Extract the part of the graph around the given roots.
    ///
    /// The result holds every root in `predecessors_of` with all of its
    /// ancestors, plus every root in `successors_of` with all of its
    /// descendants. Edges between kept vertices are copied over; the source
    /// graph is not modified.
    pub fn subgraph(
        &self,
        predecessors_of: &[Vertex],
        successors_of: &[Vertex],
    ) -> GraphResult<Dag<T>>
    where
        T: Clone,
    {
        let predecessor_roots = predecessors_of
            .iter()
            .map(|&v| self.index_of(v))
            .collect::<GraphResult<Vec<_>>>()?;
        let successor_roots = successors_of
            .iter()
            .map(|&v| self.index_of(v))
            .collect::<GraphResult<Vec<_>>>()?;

        let mut upstream: BTreeSet<NodeIndex> = predecessor_roots.iter().copied().collect();
        for &root in &predecessor_roots {
            upstream.extend(self.closure(root, Direction::Incoming).into_iter().map(|v| v.index));
        }

        let mut downstream: BTreeSet<NodeIndex> = successor_roots.iter().copied().collect();
        for &root in &successor_roots {
            downstream.extend(self.closure(root, Direction::Outgoing).into_iter().map(|v| v.index));
        }

        let mut result = Dag::new();
        let mut mapping: HashMap<NodeIndex, Vertex> = HashMap::new();
        for &index in upstream.union(&downstream) {
            mapping.insert(index, result.add_vertex(self.graph[index].clone()));
        }

        let mut edges = BTreeSet::new();
        for &index in &upstream {
            edges.extend(self.graph.edges_directed(index, Direction::Incoming).map(|e| e.id()));
        }
        for &index in &downstream {
            edges.extend(self.graph.edges_directed(index, Direction::Outgoing).map(|e| e.id()));
        }

        for edge in edges {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                if let (Some(&from), Some(&to)) = (mapping.get(&source), mapping.get(&target)) {
                    result.add_edge(from, to)?;
                }
            }
        }

        Ok(result)
    }

    pub(super) fn reaches(&self, from: NodeIndex, to: NodeIndex) -> bool {
        let mut dfs = Dfs::new(&self.graph, from);
        // The first node yielded is `from` itself.
        dfs.next(&self.graph);
        while let Some(index) = dfs.next(&self.graph) {
            if index == to {
                return true;
            }
        }
        false
    }

    fn neighbors(&self, index: NodeIndex, direction: Direction) -> Vec<Vertex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                (edge.id(), other)
            })
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, other)| self.handle(other)).collect()
    }

    fn closure(&self, start: NodeIndex, direction: Direction) -> Vec<Vertex> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        self.walk(start, direction, &mut seen, &mut result);
        result
    }

    fn walk(
        &self,
        index: NodeIndex,
        direction: Direction,
        seen: &mut HashSet<NodeIndex>,
        result: &mut Vec<Vertex>,
    ) {
        for next in self.neighbors(index, direction) {
            if seen.insert(next.index) {
                result.push(next);
                self.walk(next.index, direction, seen, result);
            }
        }
    }

    fn level_of(&self, index: NodeIndex, memo: &mut HashMap<NodeIndex, usize>) -> usize {
        if let Some(&level) = memo.get(&index) {
            return level;
        }

        let deepest = self
            .graph
            .neighbors_directed(index, Direction::Incoming)
            .map(|pred| self.level_of(pred, memo))
            .max()
            .unwrap_or(0);

        memo.insert(index, deepest + 1);
        deepest + 1
    }
}
