//! End-to-end projection behavior on small hand-built affiliation graphs

use coemploy::graph::{canonical_pair, GraphStore, NodeKind};
use coemploy::ingest::{AffiliationBuilder, EmploymentRecord};
use coemploy::interval::{EpochDay, IntervalIndex, OverlapEvaluator, Threshold, YearRange};
use coemploy::persistence::{load_graph, save_graph};
use coemploy::projection::{project, EvictionPolicy, ProjectionConfig};
use std::collections::BTreeSet;
use tempfile::TempDir;

fn day(y: i32, m: u32, d: u32) -> EpochDay {
    EpochDay::from_ymd(y, m, d).unwrap()
}

fn record(worker: u64, employer: u64, year: i32, from: (u32, u32), to: (u32, u32)) -> EmploymentRecord<u64> {
    EmploymentRecord::new(
        worker,
        employer,
        year,
        day(year, from.0, from.1),
        day(year, to.0, to.1),
    )
}

/// Workers 1..=9 (8 has no employer), employers 10, 20, 30
fn scenario_b() -> GraphStore<u64> {
    let mut builder = AffiliationBuilder::new();
    let records = vec![
        // employer 10: 1 overlaps 2 in 1999 and 3 in 2001
        record(1, 10, 1999, (1, 1), (12, 31)),
        record(1, 10, 2000, (1, 1), (12, 31)),
        record(1, 10, 2001, (1, 1), (12, 31)),
        record(2, 10, 1999, (5, 5), (12, 31)),
        record(3, 10, 2001, (6, 6), (12, 31)),
        // 2 and 9 overlap in 2002
        record(2, 10, 2002, (5, 5), (12, 31)),
        record(9, 10, 2002, (1, 1), (6, 1)),
        // employer 20
        record(9, 20, 2003, (1, 1), (6, 1)),
        record(9, 20, 2004, (1, 1), (6, 1)),
        record(4, 20, 2004, (1, 1), (10, 31)),
        record(5, 20, 2004, (7, 1), (12, 31)),
        record(6, 20, 2004, (11, 1), (12, 25)),
        // employer 30
        record(5, 30, 2005, (1, 1), (7, 1)),
        record(7, 30, 2005, (1, 1), (6, 1)),
        record(4, 30, 2005, (7, 1), (7, 1)),
    ];
    builder.extend(records).unwrap();

    let mut store = builder.finish();
    // Never employed, still part of the worker universe
    store.add_node_with_kind(8, NodeKind::Worker);
    store
}

fn edge_set(store: &GraphStore<u64>) -> BTreeSet<(u64, u64)> {
    store
        .edge_records()
        .into_iter()
        .map(|(a, b, _)| canonical_pair(*a, *b))
        .collect()
}

fn run(source: &GraphStore<u64>, config: ProjectionConfig) -> GraphStore<u64> {
    let mut output = GraphStore::new();
    project(source, &mut output, config).unwrap();
    output
}

fn with_min_days(min_days: i64) -> ProjectionConfig {
    ProjectionConfig::new(Threshold::from_min_days(min_days).unwrap(), YearRange::all())
}

#[test]
fn test_scenario_a() {
    let mut builder = AffiliationBuilder::new();
    builder.add(record(1, 10, 1999, (1, 1), (12, 31))).unwrap();
    builder.add(record(2, 10, 1999, (5, 5), (12, 31))).unwrap();
    let source = builder.finish();

    let connected = run(&source, with_min_days(1));
    assert!(connected.is_edge_between(&1, &2));
    assert_eq!(connected.edge_count(), 1);

    let too_strict = run(&source, with_min_days(300));
    assert!(!too_strict.is_edge_between(&1, &2));
    assert_eq!(too_strict.node_count(), 2);
}

#[test]
fn test_scenario_b_min_days() {
    let output = run(&scenario_b(), with_min_days(1));

    assert_eq!(output.node_count(), 9);
    let expected: BTreeSet<(u64, u64)> = [(1, 2), (1, 3), (2, 9), (4, 9), (4, 5), (5, 6), (5, 7)]
        .into_iter()
        .collect();
    assert_eq!(edge_set(&output), expected);

    for (a, b) in [(9, 1), (2, 3), (4, 6), (7, 4), (9, 5), (7, 7), (9, 8)] {
        assert!(!output.is_edge_between(&a, &b), "unexpected edge ({}, {})", a, b);
    }
    assert!(output.is_node(&8));
    assert_eq!(output.degree(&8).unwrap(), 0);
}

#[test]
fn test_scenario_c_any_overlap() {
    let output = run(&scenario_b(), with_min_days(-1));

    assert_eq!(output.node_count(), 9);
    for (a, b) in [
        (1, 2),
        (1, 3),
        (2, 3),
        (9, 1),
        (9, 2),
        (9, 3),
        (9, 4),
        (9, 5),
        (4, 7),
        (4, 6),
        (4, 5),
        (5, 6),
        (5, 7),
        (6, 9),
    ] {
        assert!(output.is_edge_between(&a, &b), "missing edge ({}, {})", a, b);
    }
    for (a, b) in [(3, 7), (7, 7), (9, 8), (9, 7), (1, 7), (1, 5)] {
        assert!(!output.is_edge_between(&a, &b), "unexpected edge ({}, {})", a, b);
    }
    assert_eq!(output.edge_count(), 14);
}

#[test]
fn test_no_self_loops() {
    for min_days in [-1, 0, 1, 30] {
        let output = run(&scenario_b(), with_min_days(min_days));
        for (a, b) in edge_set(&output) {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn test_threshold_monotonicity() {
    let source = scenario_b();
    let thresholds = [-1, 0, 1, 10, 28, 29, 60, 120, 400];
    let sets: Vec<BTreeSet<(u64, u64)>> = thresholds
        .iter()
        .map(|&t| edge_set(&run(&source, with_min_days(t))))
        .collect();

    for pair in sets.windows(2) {
        assert!(pair[0].is_superset(&pair[1]));
    }
    assert!(sets.last().unwrap().is_empty());
}

#[test]
fn test_year_range_monotonicity() {
    let source = scenario_b();
    let mut previous = BTreeSet::new();
    for max_year in 1998..=2006 {
        let config = ProjectionConfig::new(Threshold::MinDays(1), YearRange::up_to(max_year));
        let edges = edge_set(&run(&source, config));
        assert!(edges.is_superset(&previous), "max_year {}", max_year);
        previous = edges;
    }

    let config = ProjectionConfig::new(Threshold::MinDays(1), YearRange::up_to(2003));
    let expected: BTreeSet<(u64, u64)> = [(1, 2), (1, 3), (2, 9)].into_iter().collect();
    assert_eq!(edge_set(&run(&source, config)), expected);
}

#[test]
fn test_overlap_symmetry_over_all_pairs() {
    let source = scenario_b();
    let employers: Vec<u64> = source.keys_of_kind(NodeKind::Employer).copied().collect();

    for employer in employers {
        let staff = source.neighbors(&employer).unwrap();
        for u in &staff {
            for v in &staff {
                let iu = IntervalIndex::from_attrs(
                    source
                        .edge_attrs(source.get_edge_between(u, &employer).unwrap().unwrap())
                        .unwrap(),
                    YearRange::all(),
                );
                let iv = IntervalIndex::from_attrs(
                    source
                        .edge_attrs(source.get_edge_between(v, &employer).unwrap().unwrap())
                        .unwrap(),
                    YearRange::all(),
                );
                assert_eq!(
                    OverlapEvaluator::total_overlap_days(&iu, &iv),
                    OverlapEvaluator::total_overlap_days(&iv, &iu)
                );
            }
        }
    }
}

#[test]
fn test_rerun_is_idempotent() {
    let source = scenario_b();
    let first = edge_set(&run(&source, with_min_days(1)));
    let second = edge_set(&run(&source, with_min_days(1)));
    assert_eq!(first, second);

    for policy in [EvictionPolicy::Retain, EvictionPolicy::Recompute] {
        let edges = edge_set(&run(&source, with_min_days(1).with_eviction(policy)));
        assert_eq!(edges, first);
    }
}

#[test]
fn test_projection_from_saved_graph() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("affiliation.bin");
    let output_path = temp_dir.path().join("coworkers.bin");

    let source = scenario_b();
    save_graph(&input, &source).unwrap();
    let loaded: GraphStore<u64> = load_graph(&input).unwrap();

    let output = run(&loaded, with_min_days(1));
    save_graph(&output_path, &output).unwrap();
    let reloaded: GraphStore<u64> = load_graph(&output_path).unwrap();

    assert_eq!(edge_set(&reloaded), edge_set(&run(&source, with_min_days(1))));
    assert_eq!(reloaded.node_kind(&8).unwrap(), Some(NodeKind::Worker));
}
