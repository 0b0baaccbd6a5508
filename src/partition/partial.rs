//! Per-slice results and their on-disk directory

use super::{PartitionError, PartitionResult};
use crate::graph::{canonical_pair, GraphStore, NodeKey, NodeKind};
use crate::interval::{Threshold, YearRange};
use crate::persistence::snapshot::NodeRecord;
use crate::persistence::{codec, PersistenceError};
use crate::projection::ProjectionStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output of one slice: the nodes it placed and its canonical pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "K: Serialize", deserialize = "K: NodeKey"))]
pub struct PartialResult<K> {
    pub index: usize,
    pub count: usize,
    /// Fingerprint of the source graph the slice was projected from
    pub source_digest: [u8; 32],
    pub threshold: Threshold,
    pub years: YearRange,
    pub nodes: Vec<NodeRecord<K>>,
    pub pairs: BTreeSet<(K, K)>,
    pub stats: ProjectionStats,
}

impl<K: NodeKey> PartialResult<K> {
    /// Collect a slice's output graph into a partial result
    pub fn from_output(
        index: usize,
        count: usize,
        source_digest: [u8; 32],
        threshold: Threshold,
        years: YearRange,
        output: &GraphStore<K>,
        stats: ProjectionStats,
    ) -> Self {
        let nodes = output
            .keys()
            .filter_map(|key| output.node(key).ok())
            .map(|node| NodeRecord {
                key: node.key.clone(),
                kind: node.kind,
                attrs: node.attrs.clone(),
            })
            .collect();

        let pairs = output
            .edge_records()
            .into_iter()
            .map(|(a, b, _)| canonical_pair(a.clone(), b.clone()))
            .collect();

        Self {
            index,
            count,
            source_digest,
            threshold,
            years,
            nodes,
            pairs,
            stats,
        }
    }

    /// Insert this partial's nodes and pairs into `target`.
    ///
    /// Nodes already present keep their attributes; pairs already connected
    /// are left alone, so merging the same partial twice is a no-op.
    pub fn merge_into(&self, target: &mut GraphStore<K>) -> PartitionResult<usize> {
        for record in &self.nodes {
            if target.is_node(&record.key) {
                continue;
            }
            target.add_node_with_kind(record.key.clone(), record.kind.unwrap_or(NodeKind::Worker));
            for (name, value) in &record.attrs {
                target.add_node_attr(&record.key, name.clone(), value.clone())?;
            }
        }

        let mut created = 0;
        for (a, b) in &self.pairs {
            if target.is_edge_between(a, b) {
                continue;
            }
            if target.add_edge(a, b).is_some() {
                created += 1;
            }
        }
        Ok(created)
    }
}

/// First bytes of a digest, for log and error messages
pub(crate) fn short_digest(digest: &[u8; 32]) -> String {
    digest[..6].iter().map(|b| format!("{:02x}", b)).collect()
}

/// File name of slice `index` out of `count`
pub fn partial_file_name(index: usize, count: usize) -> String {
    format!("partial-{:04}-of-{:04}.bin", index, count)
}

/// Directory holding the partial artifacts of one run
#[derive(Debug, Clone)]
pub struct PartialStore {
    dir: PathBuf,
}

impl PartialStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, index: usize, count: usize) -> PathBuf {
        self.dir.join(partial_file_name(index, count))
    }

    pub fn exists(&self, index: usize, count: usize) -> bool {
        self.path_for(index, count).is_file()
    }

    /// Delete the artifact of slice `index`, if any
    pub fn remove(&self, index: usize, count: usize) -> PartitionResult<bool> {
        let path = self.path_for(index, count);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed stale partition {}/{} at {:?}", index, count, path);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PersistenceError::from(e).into()),
        }
    }

    pub fn save<K: NodeKey>(&self, partial: &PartialResult<K>) -> PartitionResult<PathBuf> {
        let path = self.path_for(partial.index, partial.count);
        codec::save(&path, partial)?;
        debug!(
            pairs = partial.pairs.len(),
            "Saved partition {}/{} to {:?}",
            partial.index,
            partial.count,
            path
        );
        Ok(path)
    }

    /// Load slice `index` and check it belongs to a `count`-way plan
    pub fn load<K: NodeKey>(&self, index: usize, count: usize) -> PartitionResult<PartialResult<K>> {
        let path = self.path_for(index, count);
        let partial: PartialResult<K> = codec::load(&path)?;
        if partial.index != index || partial.count != count {
            return Err(PersistenceError::Mismatch(format!(
                "{:?} holds partition {}/{}, expected {}/{}",
                path, partial.index, partial.count, index, count
            ))
            .into());
        }
        Ok(partial)
    }

    /// Slices of a `count`-way plan with no artifact yet
    pub fn missing(&self, count: usize) -> Vec<usize> {
        (0..count).filter(|&index| !self.exists(index, count)).collect()
    }

    /// Merge every slice of a `count`-way plan into `target`.
    ///
    /// Fails without touching `target` if any slice is missing. Partials
    /// built from a different source graph, threshold or year range than
    /// partition 0 are rejected.
    pub fn merge_all<K: NodeKey>(&self, count: usize, target: &mut GraphStore<K>) -> PartitionResult<ProjectionStats> {
        if count == 0 {
            return Err(PartitionError::InvalidSlice { index: 0, count });
        }
        let missing = self.missing(count);
        if !missing.is_empty() {
            return Err(PartitionError::MissingPartitions(missing));
        }

        let mut partials: Vec<PartialResult<K>> = Vec::with_capacity(count);
        for index in 0..count {
            let partial = self.load(index, count)?;
            if let Some(first) = partials.first() {
                if first.source_digest != partial.source_digest {
                    return Err(PersistenceError::Mismatch(format!(
                        "partition {} was projected from source {}, partition 0 from {}",
                        index,
                        short_digest(&partial.source_digest),
                        short_digest(&first.source_digest)
                    ))
                    .into());
                }
                if first.threshold != partial.threshold || first.years != partial.years {
                    return Err(PersistenceError::Mismatch(format!(
                        "partition {} was built with threshold {} over {:?}, partition 0 with {} over {:?}",
                        index, partial.threshold, partial.years, first.threshold, first.years
                    ))
                    .into());
                }
            }
            partials.push(partial);
        }

        let mut stats = ProjectionStats::default();
        let mut created = 0;
        for partial in &partials {
            created += partial.merge_into(target)?;
            stats.absorb(&partial.stats);
        }
        info!(
            partitions = count,
            nodes = target.node_count(),
            edges = target.edge_count(),
            "Merged {} new edges",
            created
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Value;
    use tempfile::TempDir;

    fn partial(index: usize, count: usize, pairs: &[(u64, u64)]) -> PartialResult<u64> {
        let mut output = GraphStore::new();
        for &(a, b) in pairs {
            output.add_node_with_kind(a, NodeKind::Worker);
            output.add_node_with_kind(b, NodeKind::Worker);
            output.add_edge(&a, &b);
        }
        PartialResult::from_output(
            index,
            count,
            [7; 32],
            Threshold::MinDays(1),
            YearRange::all(),
            &output,
            ProjectionStats::default(),
        )
    }

    #[test]
    fn test_file_name() {
        assert_eq!(partial_file_name(3, 12), "partial-0003-of-0012.bin");
    }

    #[test]
    fn test_pairs_are_canonical() {
        let p = partial(0, 1, &[(5, 2), (2, 5), (1, 9)]);
        let pairs: Vec<(u64, u64)> = p.pairs.iter().copied().collect();
        assert_eq!(pairs, vec![(1, 9), (2, 5)]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let p = partial(0, 1, &[(1, 2), (2, 3)]);
        let mut target = GraphStore::new();
        assert_eq!(p.merge_into(&mut target).unwrap(), 2);
        assert_eq!(p.merge_into(&mut target).unwrap(), 0);
        assert_eq!(target.edge_count(), 2);
        assert_eq!(target.node_count(), 3);
    }

    #[test]
    fn test_missing_then_merge() {
        let temp_dir = TempDir::new().unwrap();
        let store = PartialStore::new(temp_dir.path());
        store.save(&partial(1, 3, &[(1, 2)])).unwrap();
        assert_eq!(store.missing(3), vec![0, 2]);

        let mut target = GraphStore::<u64>::new();
        let err = store.merge_all(3, &mut target).unwrap_err();
        assert!(matches!(err, PartitionError::MissingPartitions(ref m) if m == &vec![0, 2]));
        assert_eq!(target.node_count(), 0);

        store.save(&partial(0, 3, &[(2, 1), (3, 4)])).unwrap();
        store.save(&partial(2, 3, &[])).unwrap();
        assert!(store.missing(3).is_empty());
        store.merge_all(3, &mut target).unwrap();
        assert_eq!(target.edge_count(), 2);
    }

    #[test]
    fn test_load_detects_mismatched_plan() {
        let temp_dir = TempDir::new().unwrap();
        let store = PartialStore::new(temp_dir.path());
        let saved = store.save(&partial(0, 2, &[(1, 2)])).unwrap();
        std::fs::copy(&saved, store.path_for(1, 2)).unwrap();

        let err = store.load::<u64>(1, 2).unwrap_err();
        assert!(matches!(err, PartitionError::Persistence(PersistenceError::Mismatch(_))));
    }

    #[test]
    fn test_merge_rejects_partials_from_another_source() {
        let temp_dir = TempDir::new().unwrap();
        let store = PartialStore::new(temp_dir.path());
        store.save(&partial(0, 2, &[(1, 2)])).unwrap();
        let mut stale = partial(1, 2, &[(3, 4)]);
        stale.source_digest = [9; 32];
        store.save(&stale).unwrap();

        let mut target = GraphStore::<u64>::new();
        let err = store.merge_all(2, &mut target).unwrap_err();
        assert!(matches!(err, PartitionError::Persistence(PersistenceError::Mismatch(_))));
        assert_eq!(target.node_count(), 0);
    }

    #[test]
    fn test_merge_carries_node_attributes() {
        let mut p = partial(0, 1, &[(1, 2)]);
        p.nodes[0].attrs.insert("sector".to_string(), "metal".into());
        let key = p.nodes[0].key;

        let mut target = GraphStore::new();
        p.merge_into(&mut target).unwrap();
        assert_eq!(target.node_attr(&key, "sector").unwrap(), &Value::from("metal"));
    }

    #[test]
    fn test_remove_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = PartialStore::new(temp_dir.path());
        store.save(&partial(0, 1, &[(1, 2)])).unwrap();

        assert!(store.remove(0, 1).unwrap());
        assert!(!store.exists(0, 1));
        assert!(!store.remove(0, 1).unwrap());
    }
}
