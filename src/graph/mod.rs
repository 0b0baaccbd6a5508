//! Undirected multigraph store
//!
//! This module implements the graph model shared by the affiliation
//! (worker/employer) graph and the projected co-employment graph:
//! - Opaque external keys mapped bijectively onto internal handles
//! - Worker/employer type tags
//! - Typed attributes on nodes and edges
//! - At most one canonical edge per unordered node pair

pub mod edge;
pub mod id_index;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::Edge;
pub use id_index::IdIndex;
pub use node::Node;
pub use property::{AttrMap, Value};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{canonical_pair, EdgeId, NodeId, NodeKey, NodeKind};
