//! Affiliation graph construction
//!
//! Employment tuples come from an external parser that has already applied
//! its own filtering. The builder only turns them into nodes, edges and
//! per-year edge attributes.

use crate::graph::{EdgeId, GraphResult, GraphStore, NodeKey, NodeKind};
use crate::interval::{admission_key, demission_key, wage_key, EpochDay, IntervalResult};
use tracing::{debug, info};

/// One worker's employment at one employer in one year
#[derive(Debug, Clone, PartialEq)]
pub struct EmploymentRecord<K> {
    pub worker: K,
    pub employer: K,
    pub year: i32,
    pub admission: EpochDay,
    pub demission: EpochDay,
    pub avg_wage: Option<f64>,
}

impl<K> EmploymentRecord<K> {
    pub fn new(worker: K, employer: K, year: i32, admission: EpochDay, demission: EpochDay) -> Self {
        Self {
            worker,
            employer,
            year,
            admission,
            demission,
            avg_wage: None,
        }
    }

    /// Build a record from POSIX-second instants
    pub fn from_timestamps(
        worker: K,
        employer: K,
        year: i32,
        admission_seconds: f64,
        demission_seconds: f64,
    ) -> IntervalResult<Self> {
        Ok(Self::new(
            worker,
            employer,
            year,
            EpochDay::from_timestamp_f64(admission_seconds)?,
            EpochDay::from_timestamp_f64(demission_seconds)?,
        ))
    }

    pub fn with_wage(mut self, avg_wage: f64) -> Self {
        self.avg_wage = Some(avg_wage);
        self
    }
}

/// Accumulates employment records into an affiliation graph
pub struct AffiliationBuilder<K: NodeKey> {
    store: GraphStore<K>,
    records: u64,
}

impl<K: NodeKey> AffiliationBuilder<K> {
    pub fn new() -> Self {
        Self::from_store(GraphStore::new())
    }

    /// Keep adding to an existing affiliation graph
    pub fn from_store(store: GraphStore<K>) -> Self {
        Self { store, records: 0 }
    }

    /// Add one record, returning the (worker, employer) edge it landed on.
    ///
    /// A later record for the same pair and year overwrites that year's
    /// attributes.
    pub fn add(&mut self, record: EmploymentRecord<K>) -> GraphResult<EdgeId> {
        self.store.add_node_with_kind(record.worker.clone(), NodeKind::Worker);
        self.store.add_node_with_kind(record.employer.clone(), NodeKind::Employer);

        let edge_id = match self.store.get_edge_between(&record.worker, &record.employer)? {
            Some(edge_id) => edge_id,
            None => self.store.quick_add_edge(&record.worker, &record.employer)?,
        };

        let year = record.year;
        self.store
            .add_edge_attr(edge_id, admission_key(year), record.admission.as_i64())?;
        self.store
            .add_edge_attr(edge_id, demission_key(year), record.demission.as_i64())?;
        if let Some(wage) = record.avg_wage {
            self.store.add_edge_attr(edge_id, wage_key(year), wage)?;
        }

        self.records += 1;
        debug!(
            worker = ?record.worker,
            employer = ?record.employer,
            year,
            "Recorded employment"
        );
        Ok(edge_id)
    }

    pub fn extend<I>(&mut self, records: I) -> GraphResult<()>
    where
        I: IntoIterator<Item = EmploymentRecord<K>>,
    {
        for record in records {
            self.add(record)?;
        }
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn store(&self) -> &GraphStore<K> {
        &self.store
    }

    pub fn finish(self) -> GraphStore<K> {
        info!(
            records = self.records,
            nodes = self.store.node_count(),
            edges = self.store.edge_count(),
            "Affiliation graph built"
        );
        self.store
    }
}

impl<K: NodeKey> Default for AffiliationBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Value;
    use crate::interval::{IntervalIndex, YearRange};

    fn day(y: i32, m: u32, d: u32) -> EpochDay {
        EpochDay::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn test_one_edge_per_pair() {
        let mut builder = AffiliationBuilder::new();
        builder
            .add(EmploymentRecord::new(7u64, 70, 1999, day(1999, 1, 1), day(1999, 6, 30)).with_wage(900.0))
            .unwrap();
        builder
            .add(EmploymentRecord::new(7u64, 70, 2000, day(2000, 2, 1), day(2000, 12, 31)))
            .unwrap();
        builder
            .add(EmploymentRecord::new(8u64, 70, 2000, day(2000, 1, 1), day(2000, 3, 31)))
            .unwrap();
        assert_eq!(builder.records(), 3);

        let store = builder.finish();
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.edge_count(), 2);
        assert_eq!(store.node_kind(&70).unwrap(), Some(NodeKind::Employer));
        assert_eq!(store.node_kind(&7).unwrap(), Some(NodeKind::Worker));

        let edge = store.get_edge_between(&70, &7).unwrap().unwrap();
        assert_eq!(store.edge_attr(edge, "1999_wage").unwrap(), &Value::Float(900.0));
        assert!(store.edge_attr(edge, "2000_wage").is_err());

        let index = IntervalIndex::from_attrs(store.edge_attrs(edge).unwrap(), YearRange::all());
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(2000).unwrap().admission, day(2000, 2, 1));
    }

    #[test]
    fn test_same_year_overwrites() {
        let mut builder = AffiliationBuilder::new();
        let first = builder
            .add(EmploymentRecord::new(1u64, 2, 2001, day(2001, 1, 1), day(2001, 1, 31)))
            .unwrap();
        let second = builder
            .add(EmploymentRecord::new(1u64, 2, 2001, day(2001, 3, 1), day(2001, 3, 31)))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(
            builder.store().edge_attr(first, "2001_admission").unwrap(),
            &Value::Int(day(2001, 3, 1).as_i64())
        );
    }

    #[test]
    fn test_from_timestamps() {
        // 1999-05-05 00:00:00 UTC
        let record = EmploymentRecord::from_timestamps(1u64, 2, 1999, 925_862_400.0, 946_598_400.0).unwrap();
        assert_eq!(record.admission, day(1999, 5, 5));
        assert_eq!(record.demission, day(1999, 12, 31));
        assert!(EmploymentRecord::from_timestamps(1u64, 2, 1999, f64::NAN, 0.0).is_err());
    }
}
