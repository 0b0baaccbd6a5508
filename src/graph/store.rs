//! In-memory undirected multigraph storage
//!
//! Nodes are addressed by caller-chosen external keys; the store issues
//! dense internal handles and keeps the key/handle bijection private.
//! Every unordered node pair resolves to at most one canonical edge
//! (the first one written), even when `quick_add_edge` has been used to
//! bypass the existence check.

use super::edge::Edge;
use super::id_index::IdIndex;
use super::node::Node;
use super::property::{AttrMap, Value};
use super::types::{canonical_pair, EdgeId, NodeId, NodeKey, NodeKind};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(String),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("No edge between {0} and {1}")]
    NoEdgeBetween(String, String),

    #[error("Attribute '{name}' not found on {owner}")]
    AttributeNotFound { owner: String, name: String },
}

impl GraphError {
    pub(crate) fn node_not_found<K: NodeKey>(key: &K) -> Self {
        GraphError::NodeNotFound(format!("{:?}", key))
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph storage
///
/// Uses hash maps for O(1) amortized lookup:
/// - ids: external key <-> NodeId
/// - nodes: NodeId -> Node (insertion ordered)
/// - edges: EdgeId -> Edge
/// - adjacency: NodeId -> incident EdgeIds
/// - pair_index: canonical (NodeId, NodeId) -> first EdgeId written
#[derive(Debug, Clone)]
pub struct GraphStore<K: NodeKey = u64> {
    ids: IdIndex<K>,
    nodes: IndexMap<NodeId, Node<K>, FxBuildHasher>,
    edges: FxHashMap<EdgeId, Edge>,
    adjacency: FxHashMap<NodeId, Vec<EdgeId>>,
    pair_index: FxHashMap<(NodeId, NodeId), EdgeId>,
    next_node_id: u64,
    next_edge_id: u64,
}

impl<K: NodeKey> GraphStore<K> {
    /// Create a new empty graph store
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        GraphStore {
            ids: IdIndex::with_capacity(nodes),
            nodes: IndexMap::with_capacity_and_hasher(nodes, FxBuildHasher),
            edges: FxHashMap::with_capacity_and_hasher(edges, Default::default()),
            adjacency: FxHashMap::with_capacity_and_hasher(nodes, Default::default()),
            pair_index: FxHashMap::with_capacity_and_hasher(edges, Default::default()),
            next_node_id: 1,
            next_edge_id: 1,
        }
    }

    // ---------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------

    /// Add a node if it doesn't exist yet. Returns its handle either way.
    pub fn add_node(&mut self, key: K) -> NodeId {
        if let Some(handle) = self.ids.handle(&key) {
            return handle;
        }

        let handle = NodeId::new(self.next_node_id);
        self.next_node_id += 1;

        self.ids.insert(key.clone(), handle);
        self.nodes.insert(handle, Node::new(handle, key));
        self.adjacency.insert(handle, Vec::new());
        handle
    }

    /// Add a node (idempotently) and tag it with a kind
    pub fn add_node_with_kind(&mut self, key: K, kind: NodeKind) -> NodeId {
        let handle = self.add_node(key);
        if let Some(node) = self.nodes.get_mut(&handle) {
            if let Some(previous) = node.kind {
                if previous != kind {
                    warn!("Node {:?} retagged from {} to {}", node.key, previous, kind);
                }
            }
            node.kind = Some(kind);
        }
        handle
    }

    pub fn set_node_kind(&mut self, key: &K, kind: NodeKind) -> GraphResult<()> {
        let node = self.node_mut(key)?;
        node.kind = Some(kind);
        Ok(())
    }

    pub fn node_kind(&self, key: &K) -> GraphResult<Option<NodeKind>> {
        Ok(self.node(key)?.kind)
    }

    /// Delete a node and all its incident edges. Absent nodes are a logged
    /// no-op.
    pub fn delete_node(&mut self, key: &K) -> Option<Node<K>> {
        let handle = match self.ids.remove(key) {
            Some(handle) => handle,
            None => {
                debug!("Could not delete node {:?} because it doesn't exist", key);
                return None;
            }
        };

        let incident = self.adjacency.remove(&handle).unwrap_or_default();
        for edge_id in incident {
            if let Some(edge) = self.edges.remove(&edge_id) {
                self.pair_index.remove(&canonical_pair(edge.a, edge.b));
                if let Some(other) = edge.other(handle) {
                    if let Some(list) = self.adjacency.get_mut(&other) {
                        list.retain(|e| *e != edge_id);
                    }
                }
            }
        }

        self.nodes.swap_remove(&handle)
    }

    pub fn is_node(&self, key: &K) -> bool {
        self.ids.contains(key)
    }

    pub fn node(&self, key: &K) -> GraphResult<&Node<K>> {
        self.ids
            .handle(key)
            .and_then(|h| self.nodes.get(&h))
            .ok_or_else(|| GraphError::node_not_found(key))
    }

    fn node_mut(&mut self, key: &K) -> GraphResult<&mut Node<K>> {
        let handle = self.ids.handle(key).ok_or_else(|| GraphError::node_not_found(key))?;
        self.nodes
            .get_mut(&handle)
            .ok_or_else(|| GraphError::node_not_found(key))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All external keys, in insertion order (modulo deletions)
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.nodes.values().map(|n| &n.key)
    }

    /// External keys of nodes tagged with `kind`
    pub fn keys_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &K> {
        self.nodes
            .values()
            .filter(move |n| n.is_kind(kind))
            .map(|n| &n.key)
    }

    /// Copy a node with its kind and attributes into another store.
    ///
    /// Returns false if the node doesn't exist here or already exists there.
    pub fn copy_node(&self, key: &K, dst: &mut GraphStore<K>) -> bool {
        let node = match self.node(key) {
            Ok(node) => node,
            Err(_) => return false,
        };
        if dst.is_node(key) {
            return false;
        }

        let handle = dst.add_node(key.clone());
        if let Some(copy) = dst.nodes.get_mut(&handle) {
            copy.kind = node.kind;
            copy.attrs = node.attrs.clone();
        }
        true
    }

    // ---------------------------------------------------------------------
    // Edges
    // ---------------------------------------------------------------------

    /// Add an edge between two existing nodes, returning the canonical edge.
    ///
    /// If an edge already connects the pair, that edge is returned and
    /// nothing is created. A missing endpoint is a logged no-op.
    pub fn add_edge(&mut self, a: &K, b: &K) -> Option<EdgeId> {
        let Some(ha) = self.ids.handle(a) else {
            warn!("Couldn't add edge from node {:?} because such node doesn't exist", a);
            return None;
        };
        let Some(hb) = self.ids.handle(b) else {
            warn!("Couldn't add edge to node {:?} because such node doesn't exist", b);
            return None;
        };

        if let Some(existing) = self.pair_index.get(&canonical_pair(ha, hb)) {
            return Some(*existing);
        }
        Some(self.insert_edge(ha, hb))
    }

    /// Add an edge without checking whether the pair is already connected.
    ///
    /// Precondition: the caller guarantees no edge connects `a` and `b` yet.
    /// Violating it creates a parallel edge that pair lookups never return
    /// (the first edge written stays canonical).
    pub fn quick_add_edge(&mut self, a: &K, b: &K) -> GraphResult<EdgeId> {
        let ha = self.ids.handle(a).ok_or_else(|| GraphError::node_not_found(a))?;
        let hb = self.ids.handle(b).ok_or_else(|| GraphError::node_not_found(b))?;
        Ok(self.insert_edge(ha, hb))
    }

    fn insert_edge(&mut self, a: NodeId, b: NodeId) -> EdgeId {
        let edge_id = EdgeId::new(self.next_edge_id);
        self.next_edge_id += 1;

        self.edges.insert(edge_id, Edge::new(edge_id, a, b));
        self.adjacency.entry(a).or_default().push(edge_id);
        if a != b {
            self.adjacency.entry(b).or_default().push(edge_id);
        }
        self.pair_index.entry(canonical_pair(a, b)).or_insert(edge_id);
        edge_id
    }

    /// Delete a single edge. If it was the canonical edge of its pair and a
    /// parallel edge remains, the oldest remaining one becomes canonical.
    pub fn delete_edge(&mut self, edge_id: EdgeId) -> GraphResult<Edge> {
        let edge = self
            .edges
            .remove(&edge_id)
            .ok_or(GraphError::EdgeNotFound(edge_id))?;

        for endpoint in [edge.a, edge.b] {
            if let Some(list) = self.adjacency.get_mut(&endpoint) {
                list.retain(|e| *e != edge_id);
            }
        }

        let pair = canonical_pair(edge.a, edge.b);
        if self.pair_index.get(&pair) == Some(&edge_id) {
            self.pair_index.remove(&pair);
            let successor = self
                .adjacency
                .get(&edge.a)
                .into_iter()
                .flatten()
                .filter(|e| self.edges.get(*e).is_some_and(|x| x.connects(edge.a, edge.b)))
                .min()
                .copied();
            if let Some(successor) = successor {
                self.pair_index.insert(pair, successor);
            }
        }

        Ok(edge)
    }

    /// The canonical edge between two nodes, in either direction.
    ///
    /// Fails if either node doesn't exist.
    pub fn get_edge_between(&self, a: &K, b: &K) -> GraphResult<Option<EdgeId>> {
        let ha = self.ids.handle(a).ok_or_else(|| GraphError::node_not_found(a))?;
        let hb = self.ids.handle(b).ok_or_else(|| GraphError::node_not_found(b))?;
        Ok(self.edge_between_handles(ha, hb))
    }

    /// True if both nodes exist and are connected
    pub fn is_edge_between(&self, a: &K, b: &K) -> bool {
        matches!(self.get_edge_between(a, b), Ok(Some(_)))
    }

    pub fn is_edge(&self, edge_id: EdgeId) -> bool {
        self.edges.contains_key(&edge_id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// External keys of both endpoints
    pub fn edge_endpoints(&self, edge_id: EdgeId) -> GraphResult<(&K, &K)> {
        let edge = self.edges.get(&edge_id).ok_or(GraphError::EdgeNotFound(edge_id))?;
        let a = self.ids.key(edge.a).ok_or(GraphError::EdgeNotFound(edge_id))?;
        let b = self.ids.key(edge.b).ok_or(GraphError::EdgeNotFound(edge_id))?;
        Ok((a, b))
    }

    /// All edges as `(key, key, attrs)`, oldest first
    pub fn edge_records(&self) -> Vec<(&K, &K, &AttrMap)> {
        let mut ids: Vec<EdgeId> = self.edges.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| {
                let edge = self.edges.get(&id)?;
                Some((self.ids.key(edge.a)?, self.ids.key(edge.b)?, &edge.attrs))
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Neighborhood
    // ---------------------------------------------------------------------

    /// Deduplicated set of adjacent nodes
    pub fn neighbors(&self, key: &K) -> GraphResult<Vec<K>> {
        let handle = self.ids.handle(key).ok_or_else(|| GraphError::node_not_found(key))?;
        Ok(self
            .neighbor_handles(handle)
            .into_iter()
            .filter_map(|h| self.ids.key(h).cloned())
            .collect())
    }

    /// Number of distinct neighbors
    pub fn degree(&self, key: &K) -> GraphResult<usize> {
        let handle = self.ids.handle(key).ok_or_else(|| GraphError::node_not_found(key))?;
        Ok(self.neighbor_handles(handle).len())
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    pub fn add_node_attr(&mut self, key: &K, name: impl Into<String>, value: impl Into<Value>) -> GraphResult<()> {
        self.node_mut(key)?.set_attr(name, value);
        Ok(())
    }

    pub fn node_attr(&self, key: &K, name: &str) -> GraphResult<&Value> {
        self.node(key)?
            .attr(name)
            .ok_or_else(|| GraphError::AttributeNotFound {
                owner: format!("node {:?}", key),
                name: name.to_string(),
            })
    }

    pub fn node_attrs(&self, key: &K) -> GraphResult<&AttrMap> {
        Ok(&self.node(key)?.attrs)
    }

    pub fn add_edge_attr(&mut self, edge_id: EdgeId, name: impl Into<String>, value: impl Into<Value>) -> GraphResult<()> {
        self.edges
            .get_mut(&edge_id)
            .ok_or(GraphError::EdgeNotFound(edge_id))?
            .set_attr(name, value);
        Ok(())
    }

    pub fn edge_attr(&self, edge_id: EdgeId, name: &str) -> GraphResult<&Value> {
        self.edge_attrs(edge_id)?
            .get(name)
            .ok_or_else(|| GraphError::AttributeNotFound {
                owner: edge_id.to_string(),
                name: name.to_string(),
            })
    }

    pub fn edge_attrs(&self, edge_id: EdgeId) -> GraphResult<&AttrMap> {
        self.edges
            .get(&edge_id)
            .map(|e| &e.attrs)
            .ok_or(GraphError::EdgeNotFound(edge_id))
    }

    // ---------------------------------------------------------------------
    // Handle-level access for traversal hot paths
    // ---------------------------------------------------------------------

    pub fn handle(&self, key: &K) -> Option<NodeId> {
        self.ids.handle(key)
    }

    pub fn key(&self, handle: NodeId) -> Option<&K> {
        self.ids.key(handle)
    }

    pub fn node_by_handle(&self, handle: NodeId) -> Option<&Node<K>> {
        self.nodes.get(&handle)
    }

    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Incident edges in insertion order, parallel edges included
    pub fn incident_edges(&self, handle: NodeId) -> &[EdgeId] {
        self.adjacency.get(&handle).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Deduplicated neighbor handles, O(degree)
    pub fn neighbor_handles(&self, handle: NodeId) -> Vec<NodeId> {
        let incident = self.incident_edges(handle);
        let mut seen = FxHashSet::with_capacity_and_hasher(incident.len(), Default::default());
        let mut neighbors = Vec::with_capacity(incident.len());
        for edge_id in incident {
            if let Some(other) = self.edges.get(edge_id).and_then(|e| e.other(handle)) {
                if seen.insert(other) {
                    neighbors.push(other);
                }
            }
        }
        neighbors
    }

    pub fn edge_between_handles(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.pair_index.get(&canonical_pair(a, b)).copied()
    }
}

impl<K: NodeKey> Default for GraphStore<K> {
    fn default() -> Self {
        Self::new()
    }
}
