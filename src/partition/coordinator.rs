//! Partitioned projection runs
//!
//! Each slice is an independent job against the shared read-only source
//! graph. Jobs report back over a channel; only completed slices leave an
//! artifact behind, so a failed slice can be retried on its own. A slice's
//! earlier artifact is deleted before it is projected again.

use super::partial::{short_digest, PartialResult, PartialStore};
use super::plan::PartitionPlan;
use super::{PartitionError, PartitionResult};
use crate::graph::{GraphStore, NodeKey};
use crate::persistence::fingerprint;
use crate::projection::{ProjectionConfig, ProjectionEngine, ProjectionStats};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::{debug, error, info};

/// Message a job sends back to the coordinator
#[derive(Debug)]
pub enum JobOutcome {
    Completed {
        index: usize,
        path: PathBuf,
        stats: ProjectionStats,
    },
    Failed {
        index: usize,
        error: String,
    },
}

impl JobOutcome {
    pub fn index(&self) -> usize {
        match self {
            JobOutcome::Completed { index, .. } | JobOutcome::Failed { index, .. } => *index,
        }
    }
}

/// Summary of a batch of jobs
#[derive(Debug, Default)]
pub struct RunReport {
    pub completed: Vec<usize>,
    pub failed: Vec<(usize, String)>,
    pub stats: ProjectionStats,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct PartitionCoordinator<'a, K: NodeKey> {
    source: &'a GraphStore<K>,
    source_digest: [u8; 32],
    plan: PartitionPlan<K>,
    config: ProjectionConfig,
}

impl<'a, K: NodeKey> PartitionCoordinator<'a, K> {
    pub fn new(source: &'a GraphStore<K>, partition_count: usize, config: ProjectionConfig) -> PartitionResult<Self> {
        let plan = PartitionPlan::for_store(source, partition_count)?;
        let source_digest = fingerprint(source)?;
        info!(
            workers = plan.worker_count(),
            partitions = partition_count,
            source = %short_digest(&source_digest),
            "Planned partitioned projection"
        );
        Ok(Self {
            source,
            source_digest,
            plan,
            config,
        })
    }

    pub fn plan(&self) -> &PartitionPlan<K> {
        &self.plan
    }

    pub fn source_digest(&self) -> &[u8; 32] {
        &self.source_digest
    }

    /// Project one slice in memory
    pub fn run_slice(&self, index: usize) -> PartitionResult<PartialResult<K>> {
        let workers = self.plan.slice(index)?;
        let mut output = GraphStore::new();
        let stats = ProjectionEngine::new(self.source, self.config).project_workers(workers, &mut output)?;

        Ok(PartialResult::from_output(
            index,
            self.plan.count(),
            self.source_digest,
            self.config.threshold,
            self.config.years,
            &output,
            stats,
        ))
    }

    /// Project one slice and persist it. Any earlier artifact for the slice
    /// is removed first, so a failure leaves no artifact behind.
    pub fn run_and_save(&self, index: usize, store: &PartialStore) -> PartitionResult<(PathBuf, ProjectionStats)> {
        self.plan.slice(index)?;
        store.remove(index, self.plan.count())?;
        let partial = self.run_slice(index)?;
        let path = store.save(&partial)?;
        Ok((path, partial.stats))
    }

    /// Run every slice
    pub fn run_all(&self, store: &PartialStore) -> RunReport {
        let indices: Vec<usize> = (0..self.plan.count()).collect();
        self.run_slices(&indices, store)
    }

    /// Slices whose artifact is absent, unreadable, or was built from
    /// another source graph, threshold or year range
    pub fn pending(&self, store: &PartialStore) -> Vec<usize> {
        let count = self.plan.count();
        (0..count)
            .filter(|&index| {
                if !store.exists(index, count) {
                    return true;
                }
                match store.load::<K>(index, count) {
                    Ok(partial) => !self.produced(&partial),
                    Err(e) => {
                        debug!("Partition {}/{} unusable: {}", index, count, e);
                        true
                    }
                }
            })
            .collect()
    }

    /// Run only the slices `pending` reports
    pub fn retry_missing(&self, store: &PartialStore) -> RunReport {
        let pending = self.pending(store);
        if !pending.is_empty() {
            info!("Retrying partitions {:?}", pending);
        }
        self.run_slices(&pending, store)
    }

    /// Run the given slices in parallel
    pub fn run_slices(&self, indices: &[usize], store: &PartialStore) -> RunReport {
        let (tx, rx) = mpsc::channel();

        indices.par_iter().for_each_with(tx, |tx, &index| {
            let outcome = match self.run_and_save(index, store) {
                Ok((path, stats)) => JobOutcome::Completed { index, path, stats },
                Err(e) => JobOutcome::Failed {
                    index,
                    error: e.to_string(),
                },
            };
            if let Err(e) = tx.send(outcome) {
                error!("Partition {} outcome dropped: {}", index, e);
            }
        });

        let mut report = RunReport::default();
        for outcome in rx {
            match outcome {
                JobOutcome::Completed { index, path, stats } => {
                    info!(
                        edges = stats.edges_created,
                        "Partition {}/{} written to {:?}",
                        index,
                        self.plan.count(),
                        path
                    );
                    report.stats.absorb(&stats);
                    report.completed.push(index);
                }
                JobOutcome::Failed { index, error } => {
                    error!("Partition {}/{} failed: {}", index, self.plan.count(), error);
                    report.failed.push((index, error));
                }
            }
        }
        report.completed.sort_unstable();
        report.failed.sort_unstable_by_key(|(index, _)| *index);
        report
    }

    fn produced(&self, partial: &PartialResult<K>) -> bool {
        partial.source_digest == self.source_digest
            && partial.threshold == self.config.threshold
            && partial.years == self.config.years
    }
}

/// Project `source` with `partition_count` slices and merge into `output`
pub fn run_partitioned<K: NodeKey>(
    source: &GraphStore<K>,
    output: &mut GraphStore<K>,
    partition_count: usize,
    config: ProjectionConfig,
    store: &PartialStore,
) -> PartitionResult<ProjectionStats> {
    let coordinator = PartitionCoordinator::new(source, partition_count, config)?;
    let report = coordinator.run_all(store);
    if !report.is_success() {
        let failed = report.failed.iter().map(|(index, _)| *index).collect();
        return Err(PartitionError::MissingPartitions(failed));
    }
    store.merge_all(partition_count, output)
}
