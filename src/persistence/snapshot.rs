//! Whole-graph snapshots
//!
//! Only external keys are written. Handles are re-issued on load, and
//! edges are replayed oldest first so every pair resolves to the same
//! canonical edge it had before saving.

use super::{codec, PersistenceError, PersistenceResult};
use crate::graph::{AttrMap, GraphStore, NodeKey, NodeKind, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord<K> {
    pub key: K,
    pub kind: Option<NodeKind>,
    pub attrs: AttrMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord<K> {
    pub a: K,
    pub b: K,
    pub attrs: AttrMap,
}

/// Serializable image of a `GraphStore`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot<K> {
    pub nodes: Vec<NodeRecord<K>>,
    pub edges: Vec<EdgeRecord<K>>,
}

impl<K: NodeKey> GraphSnapshot<K> {
    pub fn capture(store: &GraphStore<K>) -> Self {
        let nodes = store
            .keys()
            .filter_map(|key| store.node(key).ok())
            .map(|node| NodeRecord {
                key: node.key.clone(),
                kind: node.kind,
                attrs: node.attrs.clone(),
            })
            .collect();

        let edges = store
            .edge_records()
            .into_iter()
            .map(|(a, b, attrs)| EdgeRecord {
                a: a.clone(),
                b: b.clone(),
                attrs: attrs.clone(),
            })
            .collect();

        Self { nodes, edges }
    }

    pub fn restore(self) -> PersistenceResult<GraphStore<K>> {
        let mut store = GraphStore::with_capacity(self.nodes.len(), self.edges.len());

        for record in self.nodes {
            match record.kind {
                Some(kind) => store.add_node_with_kind(record.key.clone(), kind),
                None => store.add_node(record.key.clone()),
            };
            for (name, value) in record.attrs {
                store
                    .add_node_attr(&record.key, name, value)
                    .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
            }
        }

        for record in self.edges {
            let edge_id = store
                .quick_add_edge(&record.a, &record.b)
                .map_err(|e| PersistenceError::Corrupt(format!("edge endpoint missing: {}", e)))?;
            for (name, value) in record.attrs {
                store
                    .add_edge_attr(edge_id, name, value)
                    .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
            }
        }

        Ok(store)
    }
}

/// SHA-256 over every node and edge in store order. Attributes are hashed
/// sorted by name, so equal stores always produce the same digest.
pub fn fingerprint<K: NodeKey>(store: &GraphStore<K>) -> PersistenceResult<[u8; 32]> {
    let mut hasher = Sha256::new();

    hasher.update((store.node_count() as u64).to_le_bytes());
    for node in store.keys().filter_map(|key| store.node(key).ok()) {
        hasher.update(bincode::serialize(&(&node.key, node.kind, sorted(&node.attrs)))?);
    }

    let edges = store.edge_records();
    hasher.update((edges.len() as u64).to_le_bytes());
    for (a, b, attrs) in edges {
        hasher.update(bincode::serialize(&(a, b, sorted(attrs)))?);
    }

    Ok(hasher.finalize().into())
}

fn sorted(attrs: &AttrMap) -> BTreeMap<&String, &Value> {
    attrs.iter().collect()
}

/// Save a graph to `path`
pub fn save_graph<K: NodeKey>(path: &Path, store: &GraphStore<K>) -> PersistenceResult<()> {
    let snapshot = GraphSnapshot::capture(store);
    codec::save(path, &snapshot)?;
    info!(
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "Saved graph to {:?}",
        path
    );
    Ok(())
}

/// Load a graph previously written by `save_graph`
pub fn load_graph<K: NodeKey>(path: &Path) -> PersistenceResult<GraphStore<K>> {
    let snapshot: GraphSnapshot<K> = codec::load(path)?;
    let store = snapshot.restore()?;
    info!(
        nodes = store.node_count(),
        edges = store.edge_count(),
        "Loaded graph from {:?}",
        path
    );
    Ok(store)
}
