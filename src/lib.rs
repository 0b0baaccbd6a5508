//! Coemploy
//!
//! Derives a co-employment network from a bipartite worker/employer
//! affiliation graph. Two workers are connected when they worked for the
//! same employer with enough overlapping days.
//!
//! # Architecture
//!
//! - `graph`: undirected multigraph keyed by caller-chosen ids, with typed
//!   attributes and one canonical edge per node pair
//! - `interval`: yearly admission/demission intervals and overlap counting
//! - `projection`: the worker/worker projection itself
//! - `partition`: slicing the worker universe, persisting partial results,
//!   merging them
//! - `persistence`: checksummed graph and partial-result artifacts
//! - `ingest`: employment records to affiliation graph
//! - `config`: YAML run configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use coemploy::graph::GraphStore;
//! use coemploy::ingest::{AffiliationBuilder, EmploymentRecord};
//! use coemploy::interval::EpochDay;
//! use coemploy::projection::{project, ProjectionConfig};
//!
//! let day = |y, m, d| EpochDay::from_ymd(y, m, d).unwrap();
//!
//! let mut builder = AffiliationBuilder::new();
//! builder.add(EmploymentRecord::new(1u64, 10, 1999, day(1999, 1, 1), day(1999, 12, 31))).unwrap();
//! builder.add(EmploymentRecord::new(2u64, 10, 1999, day(1999, 5, 5), day(1999, 12, 31))).unwrap();
//! let affiliation = builder.finish();
//!
//! let mut coworkers = GraphStore::new();
//! project(&affiliation, &mut coworkers, ProjectionConfig::default()).unwrap();
//! assert!(coworkers.is_edge_between(&1, &2));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod ingest;
pub mod interval;
pub mod partition;
pub mod persistence;
pub mod projection;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, RunConfig};

pub use graph::{
    AttrMap, Edge, EdgeId, GraphError, GraphResult, GraphStore, Node, NodeId, NodeKey, NodeKind, Value,
};

pub use ingest::{AffiliationBuilder, EmploymentRecord};

pub use interval::{
    EpochDay, IntervalError, IntervalIndex, IntervalResult, OverlapEvaluator, Threshold, YearInterval, YearRange,
};

pub use partition::{
    PartialResult, PartialStore, PartitionCoordinator, PartitionError, PartitionPlan, PartitionResult, RunReport,
};

pub use persistence::{load_graph, save_graph, GraphSnapshot, PersistenceError, PersistenceResult};

pub use projection::{project, EvictionPolicy, ProjectionConfig, ProjectionEngine, ProjectionStats};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
