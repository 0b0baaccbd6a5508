//! Worker/worker projection of the affiliation graph
//!
//! For every worker, walk its employers, then every coworker at each
//! employer, and connect the pair in the output graph when their yearly
//! intervals at that employer overlap enough.

use crate::graph::{EdgeId, GraphError, GraphResult, GraphStore, NodeId, NodeKey, NodeKind};
use crate::interval::{IntervalIndex, OverlapEvaluator, Threshold, YearRange};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const DEFAULT_PROGRESS_EVERY: usize = 1000;

/// What happens to parsed interval indexes once a worker has been visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Drop an employer's cached intervals once every worker of this run
    /// adjacent to it has been visited
    #[default]
    WhenExhausted,
    /// Keep every parsed index until the run ends
    Retain,
    /// Never cache; re-parse edge attributes on every use
    Recompute,
}

/// Projection parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub threshold: Threshold,
    pub years: YearRange,
    /// Log progress every N workers; 0 disables progress logging
    pub progress_every: usize,
    pub eviction: EvictionPolicy,
}

impl ProjectionConfig {
    pub fn new(threshold: Threshold, years: YearRange) -> Self {
        Self {
            threshold,
            years,
            ..Self::default()
        }
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn with_progress_every(mut self, progress_every: usize) -> Self {
        self.progress_every = progress_every;
        self
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::MinDays(1),
            years: YearRange::all(),
            progress_every: DEFAULT_PROGRESS_EVERY,
            eviction: EvictionPolicy::default(),
        }
    }
}

/// Counters collected during a projection run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionStats {
    pub workers_visited: u64,
    pub pairs_evaluated: u64,
    pub edges_created: u64,
    pub interval_loads: u64,
    pub intervals_evicted: u64,
    /// Data issues reported while parsing intervals (counted per load)
    pub interval_issues: u64,
}

impl ProjectionStats {
    pub fn absorb(&mut self, other: &ProjectionStats) {
        self.workers_visited += other.workers_visited;
        self.pairs_evaluated += other.pairs_evaluated;
        self.edges_created += other.edges_created;
        self.interval_loads += other.interval_loads;
        self.intervals_evicted += other.intervals_evicted;
        self.interval_issues += other.interval_issues;
    }
}

/// Project the whole affiliation graph into `output`
pub fn project<K: NodeKey>(
    source: &GraphStore<K>,
    output: &mut GraphStore<K>,
    config: ProjectionConfig,
) -> GraphResult<ProjectionStats> {
    ProjectionEngine::new(source, config).project(output)
}

/// Single-use projection run over a read-only affiliation graph
pub struct ProjectionEngine<'a, K: NodeKey> {
    source: &'a GraphStore<K>,
    config: ProjectionConfig,
    evaluator: OverlapEvaluator,
    cache: FxHashMap<EdgeId, Rc<IntervalIndex>>,
    /// Employer -> workers of this run not yet visited
    pending: FxHashMap<NodeId, usize>,
    stats: ProjectionStats,
}

impl<'a, K: NodeKey> ProjectionEngine<'a, K> {
    pub fn new(source: &'a GraphStore<K>, config: ProjectionConfig) -> Self {
        Self {
            source,
            config,
            evaluator: OverlapEvaluator::new(config.threshold),
            cache: FxHashMap::default(),
            pending: FxHashMap::default(),
            stats: ProjectionStats::default(),
        }
    }

    /// Visit every worker-tagged node of the source graph
    pub fn project(self, output: &mut GraphStore<K>) -> GraphResult<ProjectionStats> {
        let workers: Vec<K> = self.source.keys_of_kind(NodeKind::Worker).cloned().collect();
        self.project_workers(&workers, output)
    }

    /// Visit only `workers`. Coworkers outside the list are still evaluated
    /// and connected; they are just never the starting side.
    pub fn project_workers(mut self, workers: &[K], output: &mut GraphStore<K>) -> GraphResult<ProjectionStats> {
        let source = self.source;
        let mut handles = Vec::with_capacity(workers.len());
        let mut seen = FxHashSet::default();
        for worker in workers {
            let handle = source
                .handle(worker)
                .ok_or_else(|| GraphError::node_not_found(worker))?;
            if !seen.insert(handle) {
                continue;
            }
            if !Self::is_worker(source, handle) {
                warn!("Skipping {:?}: not tagged as a worker", worker);
                continue;
            }
            handles.push(handle);
        }

        if self.config.eviction == EvictionPolicy::WhenExhausted {
            for &handle in &handles {
                for employer in source.neighbor_handles(handle) {
                    *self.pending.entry(employer).or_default() += 1;
                }
            }
        }

        info!(
            workers = handles.len(),
            threshold = %self.config.threshold,
            min_year = self.config.years.min,
            max_year = self.config.years.max,
            "Starting projection"
        );

        let total = handles.len();
        for (position, handle) in handles.into_iter().enumerate() {
            self.visit(handle, output)?;

            let every = self.config.progress_every;
            if every > 0 && (position + 1) % every == 0 {
                info!(
                    "Projected {}/{} workers, {} edges created",
                    position + 1,
                    total,
                    self.stats.edges_created
                );
            }
        }

        info!(
            workers = self.stats.workers_visited,
            pairs = self.stats.pairs_evaluated,
            edges = self.stats.edges_created,
            "Projection finished"
        );
        Ok(self.stats)
    }

    fn visit(&mut self, worker: NodeId, output: &mut GraphStore<K>) -> GraphResult<()> {
        let source = self.source;
        let worker_key = Self::key_of(source, worker)?;

        if !output.is_node(worker_key) {
            source.copy_node(worker_key, output);
        }

        let mut already: FxHashSet<NodeId> = output
            .neighbors(worker_key)?
            .iter()
            .filter_map(|k| source.handle(k))
            .collect();

        let employers = source.neighbor_handles(worker);
        for &employer in &employers {
            if !Self::is_kind(source, employer, NodeKind::Employer) {
                debug!("Worker {:?} is adjacent to a non-employer node", worker_key);
                continue;
            }

            let worker_intervals = match self.config.threshold {
                Threshold::Any => None,
                Threshold::MinDays(_) => Some(self.intervals(worker, employer)?),
            };

            for coworker in source.neighbor_handles(employer) {
                if coworker == worker || already.contains(&coworker) {
                    continue;
                }
                if !Self::is_worker(source, coworker) {
                    continue;
                }
                self.stats.pairs_evaluated += 1;

                let connect = match &worker_intervals {
                    None => true,
                    Some(mine) => {
                        let theirs = self.intervals(coworker, employer)?;
                        self.evaluator.qualifies(mine, &theirs)
                    }
                };

                if connect {
                    let coworker_key = Self::key_of(source, coworker)?;
                    if !output.is_node(coworker_key) {
                        source.copy_node(coworker_key, output);
                    }
                    output.add_edge(worker_key, coworker_key);
                    already.insert(coworker);
                    self.stats.edges_created += 1;
                }
            }
        }

        self.stats.workers_visited += 1;
        if self.config.eviction == EvictionPolicy::WhenExhausted {
            self.release(&employers);
        }
        Ok(())
    }

    /// Parsed intervals of the (worker, employer) edge, from cache if present
    fn intervals(&mut self, worker: NodeId, employer: NodeId) -> GraphResult<Rc<IntervalIndex>> {
        let source = self.source;
        let edge_id = source.edge_between_handles(worker, employer).ok_or_else(|| {
            GraphError::NoEdgeBetween(format!("{}", worker), format!("{}", employer))
        })?;

        if let Some(hit) = self.cache.get(&edge_id) {
            return Ok(Rc::clone(hit));
        }

        let index = IntervalIndex::from_attrs(source.edge_attrs(edge_id)?, self.config.years);
        self.stats.interval_loads += 1;

        if !index.issues().is_empty() {
            let worker_key = Self::key_of(source, worker)?;
            let employer_key = Self::key_of(source, employer)?;
            for issue in index.issues() {
                warn!(worker = ?worker_key, employer = ?employer_key, "{}", issue);
            }
            self.stats.interval_issues += index.issues().len() as u64;
        }

        let index = Rc::new(index);
        if self.config.eviction != EvictionPolicy::Recompute {
            self.cache.insert(edge_id, Rc::clone(&index));
        }
        Ok(index)
    }

    /// One more worker of each employer has been visited; drop the cached
    /// intervals of employers with none left.
    fn release(&mut self, employers: &[NodeId]) {
        let source = self.source;
        for employer in employers {
            let Some(remaining) = self.pending.get_mut(employer) else {
                continue;
            };
            *remaining = remaining.saturating_sub(1);
            if *remaining > 0 {
                continue;
            }
            self.pending.remove(employer);
            for edge_id in source.incident_edges(*employer) {
                if self.cache.remove(edge_id).is_some() {
                    self.stats.intervals_evicted += 1;
                }
            }
        }
    }

    fn key_of(source: &GraphStore<K>, handle: NodeId) -> GraphResult<&K> {
        source
            .key(handle)
            .ok_or_else(|| GraphError::NodeNotFound(handle.to_string()))
    }

    fn is_kind(source: &GraphStore<K>, handle: NodeId, kind: NodeKind) -> bool {
        source
            .node_by_handle(handle)
            .is_some_and(|n| n.is_kind(kind))
    }

    fn is_worker(source: &GraphStore<K>, handle: NodeId) -> bool {
        Self::is_kind(source, handle, NodeKind::Worker)
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{admission_key, demission_key, EpochDay};

    fn day(y: i32, m: u32, d: u32) -> i64 {
        EpochDay::from_ymd(y, m, d).unwrap().as_i64()
    }

    /// Workers 1, 2, 3 at employer 10. 1 and 2 overlap in 1999; 3 only
    /// worked there in 2005.
    fn small_graph() -> GraphStore<u64> {
        let mut store = GraphStore::new();
        for w in [1, 2, 3] {
            store.add_node_with_kind(w, NodeKind::Worker);
        }
        store.add_node_with_kind(10, NodeKind::Employer);

        let spans = [
            (1, 1999, day(1999, 1, 1), day(1999, 12, 31)),
            (2, 1999, day(1999, 5, 5), day(1999, 12, 31)),
            (3, 2005, day(2005, 1, 1), day(2005, 12, 31)),
        ];
        for (worker, year, ad, de) in spans {
            let edge = store.add_edge(&worker, &10).unwrap();
            store.add_edge_attr(edge, admission_key(year), ad).unwrap();
            store.add_edge_attr(edge, demission_key(year), de).unwrap();
        }
        store
    }

    #[test]
    fn test_extreme_instants_do_not_abort_projection() {
        let mut source = GraphStore::new();
        for w in [1u64, 2] {
            source.add_node_with_kind(w, NodeKind::Worker);
        }
        source.add_node_with_kind(10, NodeKind::Employer);
        for w in [1u64, 2] {
            let edge = source.add_edge(&w, &10).unwrap();
            source.add_edge_attr(edge, admission_key(1999), i64::MIN).unwrap();
            source.add_edge_attr(edge, demission_key(1999), i64::MAX).unwrap();
        }

        let mut output = GraphStore::new();
        let config = ProjectionConfig::new(Threshold::MinDays(1), YearRange::all());
        let stats = project(&source, &mut output, config).unwrap();
        assert!(output.is_edge_between(&1, &2));
        assert_eq!(stats.edges_created, 1);
    }

    #[test]
    fn test_project_connects_overlapping_workers() {
        let source = small_graph();
        let mut output = GraphStore::new();
        let stats = project(&source, &mut output, ProjectionConfig::default()).unwrap();

        assert_eq!(output.node_count(), 3);
        assert_eq!(output.edge_count(), 1);
        assert!(output.is_edge_between(&1, &2));
        assert!(!output.is_edge_between(&1, &3));
        assert_eq!(stats.workers_visited, 3);
        assert_eq!(stats.edges_created, 1);
        assert_eq!(output.node_kind(&3).unwrap(), Some(NodeKind::Worker));
    }

    #[test]
    fn test_year_range_limits_overlap() {
        let source = small_graph();
        let mut output = GraphStore::new();
        let config = ProjectionConfig::new(Threshold::MinDays(1), YearRange::new(2000, 2010));
        project(&source, &mut output, config).unwrap();
        assert_eq!(output.edge_count(), 0);
    }

    #[test]
    fn test_any_threshold_connects_everyone_at_employer() {
        let source = small_graph();
        let mut output = GraphStore::new();
        let config = ProjectionConfig::new(Threshold::Any, YearRange::all());
        let stats = project(&source, &mut output, config).unwrap();

        assert_eq!(output.edge_count(), 3);
        assert_eq!(stats.interval_loads, 0);
    }

    #[test]
    fn test_second_pass_skips_connected_pairs() {
        let source = small_graph();
        let mut output = GraphStore::new();
        project(&source, &mut output, ProjectionConfig::default()).unwrap();
        let again = project(&source, &mut output, ProjectionConfig::default()).unwrap();

        assert_eq!(again.edges_created, 0);
        assert_eq!(output.edge_count(), 1);
    }

    #[test]
    fn test_eviction_policies_agree() {
        let source = small_graph();
        let mut edge_sets = Vec::new();
        for policy in [EvictionPolicy::WhenExhausted, EvictionPolicy::Retain, EvictionPolicy::Recompute] {
            let mut output = GraphStore::new();
            let config = ProjectionConfig::default().with_eviction(policy);
            project(&source, &mut output, config).unwrap();
            let mut pairs: Vec<(u64, u64)> = output
                .edge_records()
                .into_iter()
                .map(|(a, b, _)| crate::graph::canonical_pair(*a, *b))
                .collect();
            pairs.sort();
            edge_sets.push(pairs);
        }
        assert_eq!(edge_sets[0], edge_sets[1]);
        assert_eq!(edge_sets[1], edge_sets[2]);
    }

    #[test]
    fn test_when_exhausted_empties_cache() {
        let source = small_graph();
        let mut output = GraphStore::new();
        let mut engine = ProjectionEngine::new(&source, ProjectionConfig::default());
        for w in [1u64, 2, 3] {
            let h = source.handle(&w).unwrap();
            for e in source.neighbor_handles(h) {
                *engine.pending.entry(e).or_default() += 1;
            }
        }
        engine.visit(source.handle(&1).unwrap(), &mut output).unwrap();
        assert!(engine.cached() > 0);
        engine.visit(source.handle(&2).unwrap(), &mut output).unwrap();
        engine.visit(source.handle(&3).unwrap(), &mut output).unwrap();
        assert_eq!(engine.cached(), 0);
        assert!(engine.stats.intervals_evicted > 0);
    }

    #[test]
    fn test_retain_keeps_cache() {
        let source = small_graph();
        let mut output = GraphStore::new();
        let mut engine =
            ProjectionEngine::new(&source, ProjectionConfig::default().with_eviction(EvictionPolicy::Retain));
        for w in [1u64, 2, 3] {
            engine.visit(source.handle(&w).unwrap(), &mut output).unwrap();
        }
        assert_eq!(engine.cached(), 3);
        assert_eq!(engine.stats.interval_loads, 3);
    }

    #[test]
    fn test_project_workers_unknown_worker_fails() {
        let source = small_graph();
        let mut output = GraphStore::new();
        let result = ProjectionEngine::new(&source, ProjectionConfig::default())
            .project_workers(&[1, 404], &mut output);
        assert_eq!(result, Err(GraphError::NodeNotFound("404".to_string())));
    }

    #[test]
    fn test_project_workers_subset_still_reaches_coworkers() {
        let source = small_graph();
        let mut output = GraphStore::new();
        let stats = ProjectionEngine::new(&source, ProjectionConfig::default())
            .project_workers(&[2], &mut output)
            .unwrap();

        assert_eq!(stats.workers_visited, 1);
        assert!(output.is_edge_between(&2, &1));
        assert!(!output.is_node(&3));
    }

    #[test]
    fn test_malformed_intervals_counted_not_fatal() {
        let mut source = small_graph();
        let edge = source.get_edge_between(&3, &10).unwrap().unwrap();
        source
            .add_edge_attr(edge, demission_key(1999), day(1999, 1, 1))
            .unwrap();
        source
            .add_edge_attr(edge, admission_key(1999), day(1999, 12, 31))
            .unwrap();

        let mut output = GraphStore::new();
        let stats = project(&source, &mut output, ProjectionConfig::default()).unwrap();
        assert!(stats.interval_issues >= 1);
        assert!(!output.is_edge_between(&1, &3));
        assert!(!output.is_edge_between(&2, &3));
    }

    #[test]
    fn test_stats_absorb() {
        let mut total = ProjectionStats::default();
        let part = ProjectionStats {
            workers_visited: 2,
            edges_created: 1,
            ..ProjectionStats::default()
        };
        total.absorb(&part);
        total.absorb(&part);
        assert_eq!(total.workers_visited, 4);
        assert_eq!(total.edges_created, 2);
    }
}
