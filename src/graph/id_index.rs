//! Bijective mapping between external keys and internal node handles
//!
//! Both directions are kept in lock-step; the only mutators are `insert`
//! and `remove`, which the graph store calls from its own mutation API.

use super::types::{NodeId, NodeKey};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct IdIndex<K: NodeKey> {
    /// External key -> handle
    handle_of: FxHashMap<K, NodeId>,
    /// Handle -> external key
    key_of: FxHashMap<NodeId, K>,
}

impl<K: NodeKey> IdIndex<K> {
    pub fn new() -> Self {
        Self {
            handle_of: FxHashMap::default(),
            key_of: FxHashMap::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handle_of: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            key_of: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Register a new pair. Returns false and changes nothing if either side
    /// is already mapped.
    pub(crate) fn insert(&mut self, key: K, handle: NodeId) -> bool {
        if self.handle_of.contains_key(&key) || self.key_of.contains_key(&handle) {
            return false;
        }
        self.key_of.insert(handle, key.clone());
        self.handle_of.insert(key, handle);
        true
    }

    /// Remove a key and its handle
    pub(crate) fn remove(&mut self, key: &K) -> Option<NodeId> {
        let handle = self.handle_of.remove(key)?;
        self.key_of.remove(&handle);
        Some(handle)
    }

    pub fn handle(&self, key: &K) -> Option<NodeId> {
        self.handle_of.get(key).copied()
    }

    pub fn key(&self, handle: NodeId) -> Option<&K> {
        self.key_of.get(&handle)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.handle_of.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handle_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handle_of.is_empty()
    }
}

impl<K: NodeKey> Default for IdIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}
