//! End-to-end scenarios through the public API: ingest a synthetic dump,
//! run the full analysis, and query the results.

use heapgraph_core::{
    AnalysisConfig, HeapAnalyzer, HeapQuery, HeapSnapshot, Ingestor, RawHeapObject, RawReference,
    RawRoot, RootKind, VecHeapSource,
};

fn raw(address: u64, type_name: &str, size: u64, targets: &[u64]) -> RawHeapObject {
    RawHeapObject {
        address,
        type_name: type_name.to_string(),
        shallow_size: size,
        generation: 0,
        references: targets
            .iter()
            .map(|&t| RawReference {
                target_address: t,
                target_type: "Node".to_string(),
                field_name: "f".to_string(),
            })
            .collect(),
    }
}

fn static_root(target: u64) -> RawRoot {
    RawRoot {
        kind: RootKind::Static,
        root_address: 0x1,
        target_address: target,
        name: "g_root".to_string(),
    }
}

fn analyzed(source: &VecHeapSource, config: &AnalysisConfig) -> HeapSnapshot {
    let mut snapshot = HeapSnapshot::new(1234);
    Ingestor::new(config)
        .ingest(&mut snapshot, source)
        .expect("ingest");
    HeapAnalyzer::new(config).analyze(&mut snapshot, source);
    snapshot
}

#[test]
fn test_linear_chain_scenario() {
    // A(10) -> B(20) -> C(30), A rooted
    let source = VecHeapSource::new(
        vec![raw(1, "A", 10, &[2]), raw(2, "B", 20, &[3]), raw(3, "C", 30, &[])],
        vec![static_root(1)],
    );
    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);

    assert_eq!(snapshot.get(1).unwrap().retained_size, 60);
    assert_eq!(snapshot.get(2).unwrap().retained_size, 50);
    assert_eq!(snapshot.get(3).unwrap().retained_size, 30);
}

#[test]
fn test_diamond_scenario() {
    // A(10) -> B(10), A -> C(10), B -> D(40), C -> D, A rooted
    let source = VecHeapSource::new(
        vec![
            raw(1, "A", 10, &[2, 3]),
            raw(2, "B", 10, &[4]),
            raw(3, "C", 10, &[4]),
            raw(4, "D", 40, &[]),
        ],
        vec![static_root(1)],
    );
    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);

    assert_eq!(snapshot.get(1).unwrap().retained_size, 70);
    assert_eq!(snapshot.get(2).unwrap().retained_size, 10);
    assert_eq!(snapshot.get(3).unwrap().retained_size, 10);
    assert_eq!(snapshot.get(4).unwrap().retained_size, 40);

    // D is dominated by the fork, and only once
    let tree = snapshot.dominators().expect("tree");
    assert_eq!(tree.idom(4), Some(1));
    assert_eq!(tree.children(1).iter().filter(|&&c| c == 4).count(), 1);
}

#[test]
fn test_cycle_scenario() {
    // A(10) <-> B(10), A rooted
    let source = VecHeapSource::new(
        vec![raw(1, "A", 10, &[2]), raw(2, "B", 10, &[1])],
        vec![static_root(1)],
    );
    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);

    assert_eq!(snapshot.get(1).unwrap().retained_size, 20);
    assert_eq!(snapshot.get(2).unwrap().retained_size, 10);
    assert_eq!(snapshot.dominators().unwrap().idom(2), Some(1));
}

#[test]
fn test_unreachable_island_scenario() {
    let source = VecHeapSource::new(
        vec![
            raw(1, "A", 10, &[2]),
            raw(2, "B", 10, &[]),
            raw(100, "X", 100, &[200]),
            raw(200, "Y", 100, &[]),
        ],
        vec![static_root(1)],
    );
    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);

    assert_eq!(snapshot.get(1).unwrap().retained_size, 20);
    assert_eq!(snapshot.get(2).unwrap().retained_size, 10);
    // island objects keep shallow sizes and stay out of the tree
    assert_eq!(snapshot.get(100).unwrap().retained_size, 100);
    assert_eq!(snapshot.get(200).unwrap().retained_size, 100);
    assert!(!snapshot.dominators().unwrap().is_reachable(100));
}

#[test]
fn test_conservation_over_reachable_objects() {
    // mixed shape with a shared tail and an unreachable blob
    let source = VecHeapSource::new(
        vec![
            raw(1, "A", 16, &[2, 3]),
            raw(2, "B", 24, &[4]),
            raw(3, "C", 8, &[4]),
            raw(4, "D", 100, &[5]),
            raw(5, "E", 4, &[]),
            raw(99, "Junk", 1000, &[]),
        ],
        vec![static_root(1)],
    );
    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);

    let tree = snapshot.dominators().expect("tree");
    let reachable_shallow: u64 = snapshot
        .objects()
        .filter(|o| tree.is_reachable(o.address))
        .map(|o| o.shallow_size)
        .sum();
    let top_level_retained: u64 = tree
        .top_level
        .iter()
        .map(|&a| snapshot.get(a).unwrap().retained_size)
        .sum();

    assert_eq!(top_level_retained, reachable_shallow);
    assert_eq!(reachable_shallow, 152);

    for object in snapshot.objects() {
        assert!(object.retained_size >= object.shallow_size);
    }
}

#[test]
fn test_type_rollup_scenario() {
    let source = VecHeapSource::new(
        vec![
            raw(1, "List<Int>", 24, &[]),
            raw(2, "List<String>", 32, &[]),
            raw(3, "Set<Int>", 40, &[]),
        ],
        vec![],
    );
    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);
    let query = HeapQuery::new(&snapshot, &config);

    let stats = query.hierarchy_stats("List");
    assert_eq!(stats.total_instances_including_derived, 2);
    assert_eq!(stats.total_size_including_derived, 56);
    assert_eq!(stats.derived_types.len(), 2);
}

#[test]
fn test_size_bucket_scenario() {
    let source = VecHeapSource::new(
        vec![
            raw(0x10, "T", 50, &[]),
            raw(0x20, "T", 900, &[]),
            raw(0x30, "T", 5_000, &[]),
            raw(0x40, "T", 50_000, &[]),
            raw(0x50, "T", 900_000, &[]),
            raw(0x60, "T", 2 << 20, &[]),
        ],
        vec![],
    );
    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);
    let query = HeapQuery::new(&snapshot, &config);

    let hits: Vec<u64> = query
        .size_range(1_000, 100_000)
        .iter()
        .map(|o| o.address)
        .collect();
    assert_eq!(hits, vec![0x30, 0x40]);
}

#[test]
fn test_path_laws() {
    let source = VecHeapSource::new(
        vec![raw(1, "A", 8, &[2]), raw(2, "B", 8, &[])],
        vec![static_root(1)],
    );
    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);
    let query = HeapQuery::new(&snapshot, &config);

    // shortest_path(a, a) == [a]
    let self_path: Vec<u64> = query.shortest_path(1, 1).iter().map(|o| o.address).collect();
    assert_eq!(self_path, vec![1]);

    // for an edge a -> b the path has length 2
    assert_eq!(query.shortest_path(1, 2).len(), 2);

    // reachable(a, 0) == [a] for tracked a, empty otherwise
    let zero: Vec<u64> = query.reachable(1, 0).iter().map(|o| o.address).collect();
    assert_eq!(zero, vec![1]);
    assert!(query.reachable(0x9999, 0).is_empty());
}

#[test]
fn test_empty_snapshot_queries() {
    let config = AnalysisConfig::default();
    let snapshot = HeapSnapshot::new(1);
    let query = HeapQuery::new(&snapshot, &config);

    let report = query.report();
    assert_eq!(report.total_objects, 0);
    assert_eq!(report.total_memory, 0);
    assert!(query.get(0x10).is_none());
    assert!(query.by_type("T").next().is_none());
    assert!(query.size_range(0, u64::MAX).is_empty());
    assert!(query.shortest_path(1, 2).is_empty());
}

#[test]
fn test_oversized_graph_flags_approximation() {
    let source = VecHeapSource::new(
        vec![raw(1, "A", 10, &[2]), raw(2, "B", 20, &[])],
        vec![static_root(1)],
    );
    let mut config = AnalysisConfig::default();
    config.max_dominator_nodes = 2; // force the cap with 3 graph nodes

    let snapshot = analyzed(&source, &config);
    let query = HeapQuery::new(&snapshot, &config);

    let report = query.report();
    assert!(report.flags.retained_is_approximate);
    assert_eq!(snapshot.get(1).unwrap().retained_size, 10);
    assert_eq!(snapshot.get(2).unwrap().retained_size, 20);
}

#[test]
fn test_truncation_surfaces_in_report() {
    let targets: Vec<u64> = (100..250u64).collect();
    let mut objects = vec![raw(1, "Fan", 8, &targets)];
    objects.extend(targets.iter().map(|&t| raw(t, "Leaf", 8, &[])));
    let source = VecHeapSource::new(objects, vec![static_root(1)]);

    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);
    let report = HeapQuery::new(&snapshot, &config).report();

    assert_eq!(report.flags.references_truncated_count, 50);
    assert!(report.flags.is_approximate());
}

#[test]
fn test_gc_root_paths_recorded() {
    let source = VecHeapSource::new(
        vec![raw(1, "A", 8, &[])],
        vec![
            static_root(1),
            RawRoot {
                kind: RootKind::Pinned,
                root_address: 0x2,
                target_address: 1,
                name: "pinned buffer".to_string(),
            },
        ],
    );
    let config = AnalysisConfig::default();
    let snapshot = analyzed(&source, &config);

    let object = snapshot.get(1).unwrap();
    assert_eq!(object.gc_root_paths.len(), 2);
    let kinds: Vec<RootKind> = object.gc_root_paths.iter().map(|p| p.kind).collect();
    assert!(kinds.contains(&RootKind::Static));
    assert!(kinds.contains(&RootKind::Pinned));
}
