//! Partitioned execution
//!
//! The worker universe is cut into contiguous slices, each slice is
//! projected independently and persisted as a partial artifact, and the
//! partials are merged into the final graph.

pub mod coordinator;
pub mod partial;
pub mod plan;

pub use coordinator::{run_partitioned, JobOutcome, PartitionCoordinator, RunReport};
pub use partial::{partial_file_name, PartialResult, PartialStore};
pub use plan::PartitionPlan;

use crate::graph::GraphError;
use crate::persistence::PersistenceError;
use thiserror::Error;

/// Partitioning errors
#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("Invalid partition {index} of {count}")]
    InvalidSlice { index: usize, count: usize },

    #[error("Missing partitions: {0:?}")]
    MissingPartitions(Vec<usize>),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type PartitionResult<T> = Result<T, PartitionError>;
