//! Generic directed acyclic graph container.
//!
//! [`Dag`] stores vertices and edges, keeps incoming and outgoing adjacency in
//! insertion order, and refuses any edge that would close a cycle. The check
//! runs before mutation, so a rejected edge leaves the graph exactly as it was.
//!
//! The topological order is computed lazily and cached until the next
//! structural change. It is a pure function of the mutation history: ties
//! between independent vertices go to the one inserted first, and vertices are
//! grouped by rank (longest distance from a root), so each rank forms one
//! "wave" of mutually independent vertices.

use core::cmp::Reverse;
use core::fmt;
use core::hash::Hash;
use std::collections::BinaryHeap;
use std::sync::OnceLock;

use hashbrown::HashMap;
use indexmap::IndexMap;

/// An edge with known endpoints.
pub trait DagEdge<V> {
    /// The vertex the edge leaves.
    fn source(&self) -> &V;
    /// The vertex the edge enters.
    fn target(&self) -> &V;
}

impl<V> DagEdge<V> for (V, V) {
    fn source(&self) -> &V {
        &self.0
    }

    fn target(&self) -> &V {
        &self.1
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Structural rules an edge can break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidEdge {
    /// Source and target are the same vertex.
    SelfLoop,
    /// An equal edge already exists.
    Duplicate,
}

impl fmt::Display for InvalidEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidEdge::SelfLoop => write!(f, "self-loop"),
            InvalidEdge::Duplicate => write!(f, "duplicate edge"),
        }
    }
}

/// Errors raised by [`Dag`] mutations. The graph is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DagError<V> {
    /// The vertex already exists.
    DuplicateVertex(V),
    /// The vertex does not exist.
    VertexNotFound(V),
    /// The edge would create a path from `to` back to `from`.
    CycleDetected {
        /// Source of the rejected edge.
        from: V,
        /// Target of the rejected edge.
        to: V,
    },
    /// The edge breaks a structural rule.
    InvalidEdge {
        /// Source of the rejected edge.
        from: V,
        /// Target of the rejected edge.
        to: V,
        /// The broken rule.
        reason: InvalidEdge,
    },
    /// No equal edge exists.
    EdgeNotFound {
        /// Source of the missing edge.
        from: V,
        /// Target of the missing edge.
        to: V,
    },
}

impl<V: fmt::Display> fmt::Display for DagError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DagError::DuplicateVertex(v) => write!(f, "duplicate vertex: {}", v),
            DagError::VertexNotFound(v) => write!(f, "vertex not found: {}", v),
            DagError::CycleDetected { from, to } => {
                write!(f, "edge {} -> {} would create a cycle", from, to)
            }
            DagError::InvalidEdge { from, to, reason } => {
                write!(f, "invalid edge {} -> {}: {}", from, to, reason)
            }
            DagError::EdgeNotFound { from, to } => write!(f, "edge not found: {} -> {}", from, to),
        }
    }
}

impl<V: fmt::Debug + fmt::Display> core::error::Error for DagError<V> {}

// ─────────────────────────────────────────────────────────────────────────────
// Dag
// ─────────────────────────────────────────────────────────────────────────────

type EdgeKey = u64;

#[derive(Debug, Clone, Default)]
struct Adjacency {
    incoming: Vec<EdgeKey>,
    outgoing: Vec<EdgeKey>,
}

/// A cached topological order with per-vertex ranks.
#[derive(Debug, Clone)]
struct TopologicalOrder<V> {
    order: Vec<V>,
    ranks: Vec<usize>,
    positions: HashMap<V, usize>,
}

/// A directed acyclic graph over vertices `V` and edges `E`.
#[derive(Debug, Clone)]
pub struct Dag<V, E> {
    vertices: IndexMap<V, Adjacency>,
    edges: IndexMap<EdgeKey, E>,
    next_edge: EdgeKey,
    order: OnceLock<TopologicalOrder<V>>,
}

impl<V, E> Default for Dag<V, E> {
    fn default() -> Self {
        Self {
            vertices: IndexMap::new(),
            edges: IndexMap::new(),
            next_edge: 0,
            order: OnceLock::new(),
        }
    }
}

impl<V, E> Dag<V, E>
where
    V: Clone + Eq + Hash,
    E: DagEdge<V> + PartialEq,
{
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Vertices
    // ─────────────────────────────────────────────────────────────────────

    /// Adds a vertex.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::DuplicateVertex`] if the vertex already exists.
    pub fn add_vertex(&mut self, vertex: V) -> Result<(), DagError<V>> {
        if self.vertices.contains_key(&vertex) {
            return Err(DagError::DuplicateVertex(vertex));
        }
        self.vertices.insert(vertex, Adjacency::default());
        self.invalidate();
        Ok(())
    }

    /// Removes a vertex together with every incident edge.
    ///
    /// Returns the removed edges in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::VertexNotFound`] if the vertex does not exist.
    pub fn remove_vertex(&mut self, vertex: &V) -> Result<Vec<E>, DagError<V>> {
        let Some(adjacency) = self.vertices.get(vertex) else {
            return Err(DagError::VertexNotFound(vertex.clone()));
        };
        let mut keys: Vec<EdgeKey> = adjacency
            .incoming
            .iter()
            .chain(&adjacency.outgoing)
            .copied()
            .collect();
        keys.sort_unstable();
        let removed = keys.into_iter().filter_map(|key| self.detach(key)).collect();
        self.vertices.shift_remove(vertex);
        self.invalidate();
        Ok(removed)
    }

    /// Returns `true` if the vertex exists.
    #[must_use]
    pub fn contains_vertex(&self, vertex: &V) -> bool {
        self.vertices.contains_key(vertex)
    }

    /// Iterates over vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.vertices.keys()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Edges
    // ─────────────────────────────────────────────────────────────────────

    /// Adds an edge.
    ///
    /// # Errors
    ///
    /// - [`DagError::VertexNotFound`] if either endpoint is missing
    /// - [`DagError::InvalidEdge`] for a self-loop or a duplicate edge
    /// - [`DagError::CycleDetected`] if the target already reaches the source
    pub fn add_edge(&mut self, edge: E) -> Result<(), DagError<V>> {
        self.check_edge(&edge)?;

        let key = self.next_edge;
        self.next_edge += 1;
        if let Some(adjacency) = self.vertices.get_mut(edge.source()) {
            adjacency.outgoing.push(key);
        }
        if let Some(adjacency) = self.vertices.get_mut(edge.target()) {
            adjacency.incoming.push(key);
        }
        self.edges.insert(key, edge);
        self.invalidate();
        Ok(())
    }

    /// Runs every check [`add_edge`](Self::add_edge) would, without mutating.
    ///
    /// # Errors
    ///
    /// Same as [`add_edge`](Self::add_edge).
    pub fn check_edge(&self, edge: &E) -> Result<(), DagError<V>> {
        let (from, to) = (edge.source(), edge.target());
        let Some(source) = self.vertices.get(from) else {
            return Err(DagError::VertexNotFound(from.clone()));
        };
        if !self.vertices.contains_key(to) {
            return Err(DagError::VertexNotFound(to.clone()));
        }
        if from == to {
            return Err(DagError::InvalidEdge {
                from: from.clone(),
                to: to.clone(),
                reason: InvalidEdge::SelfLoop,
            });
        }
        if source
            .outgoing
            .iter()
            .any(|key| self.edges.get(key) == Some(edge))
        {
            return Err(DagError::InvalidEdge {
                from: from.clone(),
                to: to.clone(),
                reason: InvalidEdge::Duplicate,
            });
        }
        if self.has_path(to, from) {
            return Err(DagError::CycleDetected {
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(())
    }

    /// Removes the edge equal to `edge` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::EdgeNotFound`] if no equal edge exists.
    pub fn remove_edge(&mut self, edge: &E) -> Result<E, DagError<V>> {
        let key = self.vertices.get(edge.source()).and_then(|adjacency| {
            adjacency
                .outgoing
                .iter()
                .copied()
                .find(|key| self.edges.get(key) == Some(edge))
        });
        let removed = key.and_then(|key| self.detach(key));
        match removed {
            Some(removed) => {
                self.invalidate();
                Ok(removed)
            }
            None => Err(DagError::EdgeNotFound {
                from: edge.source().clone(),
                to: edge.target().clone(),
            }),
        }
    }

    /// Removes every edge matching `predicate`, returning them in insertion order.
    pub fn remove_edges_where(&mut self, mut predicate: impl FnMut(&E) -> bool) -> Vec<E> {
        let keys: Vec<EdgeKey> = self
            .edges
            .iter()
            .filter(|(_, edge)| predicate(edge))
            .map(|(key, _)| *key)
            .collect();
        if keys.is_empty() {
            return Vec::new();
        }
        let removed = keys.into_iter().filter_map(|key| self.detach(key)).collect();
        self.invalidate();
        removed
    }

    /// Iterates over edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &E> {
        self.edges.values()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the edges entering `vertex`, in insertion order.
    ///
    /// Unknown vertices have no edges.
    #[must_use]
    pub fn incoming_edges(&self, vertex: &V) -> Vec<&E> {
        self.vertices
            .get(vertex)
            .map(|adjacency| self.resolve(&adjacency.incoming))
            .unwrap_or_default()
    }

    /// Returns the edges leaving `vertex`, in insertion order.
    ///
    /// Unknown vertices have no edges.
    #[must_use]
    pub fn outgoing_edges(&self, vertex: &V) -> Vec<&E> {
        self.vertices
            .get(vertex)
            .map(|adjacency| self.resolve(&adjacency.outgoing))
            .unwrap_or_default()
    }

    /// Returns `true` if following edges from `from` reaches `to`.
    ///
    /// A vertex always reaches itself.
    #[must_use]
    pub fn has_path(&self, from: &V, to: &V) -> bool {
        let (Some(start), Some(goal)) = (
            self.vertices.get_index_of(from),
            self.vertices.get_index_of(to),
        ) else {
            return false;
        };

        let mut visited = vec![false; self.vertices.len()];
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(index) = stack.pop() {
            if index == goal {
                return true;
            }
            let Some((_, adjacency)) = self.vertices.get_index(index) else {
                continue;
            };
            for key in &adjacency.outgoing {
                let Some(next) = self
                    .edges
                    .get(key)
                    .and_then(|edge| self.vertices.get_index_of(edge.target()))
                else {
                    continue;
                };
                if !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }
        false
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ordering
    // ─────────────────────────────────────────────────────────────────────

    /// Returns every vertex in a topological order.
    ///
    /// For every edge `u -> v`, `u` comes strictly before `v`. Vertices are
    /// sorted by rank first and insertion order second.
    #[must_use]
    pub fn topological_order(&self) -> &[V] {
        &self.cached_order().order
    }

    /// Returns the rank of a vertex: `0` for roots, otherwise one more than
    /// the highest rank among its predecessors.
    #[must_use]
    pub fn rank(&self, vertex: &V) -> Option<usize> {
        let order = self.cached_order();
        order
            .positions
            .get(vertex)
            .map(|position| order.ranks[*position])
    }

    /// Returns the rank of each vertex, aligned with [`topological_order`](Self::topological_order).
    #[must_use]
    pub fn ranks(&self) -> &[usize] {
        &self.cached_order().ranks
    }

    fn cached_order(&self) -> &TopologicalOrder<V> {
        self.order.get_or_init(|| self.compute_order())
    }

    // Kahn's algorithm with a (rank, insertion index) priority queue.
    fn compute_order(&self) -> TopologicalOrder<V> {
        let count = self.vertices.len();
        let mut in_degree: Vec<usize> = self
            .vertices
            .values()
            .map(|adjacency| adjacency.incoming.len())
            .collect();
        let mut rank = vec![0_usize; count];
        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| Reverse((0, index)))
            .collect();

        let mut order = Vec::with_capacity(count);
        let mut ranks = Vec::with_capacity(count);
        let mut positions = HashMap::with_capacity(count);

        while let Some(Reverse((vertex_rank, index))) = ready.pop() {
            let Some((vertex, adjacency)) = self.vertices.get_index(index) else {
                continue;
            };
            positions.insert(vertex.clone(), order.len());
            order.push(vertex.clone());
            ranks.push(vertex_rank);

            for key in &adjacency.outgoing {
                let Some(next) = self
                    .edges
                    .get(key)
                    .and_then(|edge| self.vertices.get_index_of(edge.target()))
                else {
                    continue;
                };
                rank[next] = rank[next].max(vertex_rank + 1);
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse((rank[next], next)));
                }
            }
        }

        TopologicalOrder {
            order,
            ranks,
            positions,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn resolve(&self, keys: &[EdgeKey]) -> Vec<&E> {
        keys.iter().filter_map(|key| self.edges.get(key)).collect()
    }

    fn detach(&mut self, key: EdgeKey) -> Option<E> {
        let edge = self.edges.shift_remove(&key)?;
        if let Some(adjacency) = self.vertices.get_mut(edge.source()) {
            adjacency.outgoing.retain(|k| *k != key);
        }
        if let Some(adjacency) = self.vertices.get_mut(edge.target()) {
            adjacency.incoming.retain(|k| *k != key);
        }
        Some(edge)
    }

    fn invalidate(&mut self) {
        self.order.take();
    }
}
