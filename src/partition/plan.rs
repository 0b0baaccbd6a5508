//! Worker universe slicing

use super::{PartitionError, PartitionResult};
use crate::graph::{GraphStore, NodeKey, NodeKind};

/// Sorted worker keys cut into `count` contiguous slices of `ceil(N / count)`
#[derive(Debug, Clone)]
pub struct PartitionPlan<K> {
    workers: Vec<K>,
    count: usize,
    slice_len: usize,
}

impl<K: NodeKey> PartitionPlan<K> {
    pub fn new(mut workers: Vec<K>, count: usize) -> PartitionResult<Self> {
        if count == 0 {
            return Err(PartitionError::InvalidSlice { index: 0, count });
        }
        workers.sort();
        workers.dedup();
        let slice_len = workers.len().div_ceil(count);
        Ok(Self {
            workers,
            count,
            slice_len,
        })
    }

    /// Plan over every worker-tagged node of `store`
    pub fn for_store(store: &GraphStore<K>, count: usize) -> PartitionResult<Self> {
        Self::new(store.keys_of_kind(NodeKind::Worker).cloned().collect(), count)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Workers of slice `index`; trailing slices may be short or empty
    pub fn slice(&self, index: usize) -> PartitionResult<&[K]> {
        if index >= self.count {
            return Err(PartitionError::InvalidSlice {
                index,
                count: self.count,
            });
        }
        let start = (index * self.slice_len).min(self.workers.len());
        let end = (start + self.slice_len).min(self.workers.len());
        Ok(&self.workers[start..end])
    }

    pub fn slices(&self) -> impl Iterator<Item = &[K]> {
        (0..self.count).filter_map(move |index| self.slice(index).ok())
    }
}
