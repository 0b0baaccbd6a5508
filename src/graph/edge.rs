//! Undirected edge record stored by the graph store

use super::property::{AttrMap, Value};
use super::types::{EdgeId, NodeId};

/// An undirected edge
///
/// Endpoints are stored as given; `connects` and `other` are
/// direction-agnostic.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub a: NodeId,
    pub b: NodeId,
    pub attrs: AttrMap,
}

impl Edge {
    pub fn new(id: EdgeId, a: NodeId, b: NodeId) -> Self {
        Edge {
            id,
            a,
            b,
            attrs: AttrMap::new(),
        }
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attrs.insert(name.into(), value.into())
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Check if this edge connects two specific nodes, in either order
    pub fn connects(&self, n1: NodeId, n2: NodeId) -> bool {
        (self.a == n1 && self.b == n2) || (self.a == n2 && self.b == n1)
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.a == node {
            Some(self.b)
        } else if self.b == node {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_connects_both_ways() {
        let edge = Edge::new(EdgeId::new(1), NodeId::new(1), NodeId::new(2));
        assert!(edge.connects(NodeId::new(1), NodeId::new(2)));
        assert!(edge.connects(NodeId::new(2), NodeId::new(1)));
        assert!(!edge.connects(NodeId::new(1), NodeId::new(3)));
    }

    #[test]
    fn test_edge_other() {
        let edge = Edge::new(EdgeId::new(1), NodeId::new(4), NodeId::new(9));
        assert_eq!(edge.other(NodeId::new(4)), Some(NodeId::new(9)));
        assert_eq!(edge.other(NodeId::new(9)), Some(NodeId::new(4)));
        assert_eq!(edge.other(NodeId::new(5)), None);
        assert!(!edge.is_self_loop());
    }

    #[test]
    fn test_edge_attrs() {
        let mut edge = Edge::new(EdgeId::new(1), NodeId::new(1), NodeId::new(2));
        edge.set_attr("2004_admission", 12419i64);
        assert_eq!(edge.attr("2004_admission").and_then(Value::as_int), Some(12419));
        assert!(edge.attr("2004_demission").is_none());
    }
}
