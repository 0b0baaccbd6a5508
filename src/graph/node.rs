//! Node record stored by the graph store

use super::property::{AttrMap, Value};
use super::types::{NodeId, NodeKind};

/// A node in the affiliation or co-employment graph
///
/// Nodes carry:
/// - The caller's external key
/// - The store-local handle
/// - An optional worker/employer tag
/// - Typed attributes
#[derive(Debug, Clone)]
pub struct Node<K> {
    /// External identifier chosen by the caller
    pub key: K,

    /// Internal handle (never persisted)
    pub id: NodeId,

    /// Worker or employer, once tagged
    pub kind: Option<NodeKind>,

    /// Attributes associated with this node
    pub attrs: AttrMap,
}

impl<K> Node<K> {
    pub fn new(id: NodeId, key: K) -> Self {
        Node {
            key,
            id,
            kind: None,
            attrs: AttrMap::new(),
        }
    }

    pub fn is_kind(&self, kind: NodeKind) -> bool {
        self.kind == Some(kind)
    }

    /// Set an attribute, returning the previous value
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attrs.insert(name.into(), value.into())
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }
}
