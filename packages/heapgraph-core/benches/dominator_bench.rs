//! Dominator-tree construction benchmark over synthetic heap shapes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use heapgraph_core::{
    AnalysisConfig, DominatorOutcome, HeapSnapshot, Ingestor, LengauerTarjanBuilder,
    RawHeapObject, RawReference, RawRoot, RootKind, RootDiscovery, VecHeapSource,
};

/// Deterministic pseudo-random stream, good enough for graph shapes
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

/// A mixed shape: a long spine with random cross edges, rooted at one end
fn synthetic_snapshot(n: u64) -> (HeapSnapshot, VecHeapSource) {
    let mut rng = Lcg(0x5eed);
    let objects: Vec<RawHeapObject> = (1..=n)
        .map(|address| {
            let mut references = Vec::new();
            if address < n {
                references.push(RawReference {
                    target_address: address + 1,
                    target_type: "Node".to_string(),
                    field_name: "next".to_string(),
                });
            }
            // a couple of random forward edges
            for _ in 0..2 {
                let target = 1 + rng.next() % n;
                references.push(RawReference {
                    target_address: target,
                    target_type: "Node".to_string(),
                    field_name: "link".to_string(),
                });
            }
            RawHeapObject {
                address,
                type_name: "Node".to_string(),
                shallow_size: 16 + (address % 64),
                generation: 0,
                references,
            }
        })
        .collect();

    let source = VecHeapSource::new(
        objects,
        vec![RawRoot {
            kind: RootKind::Static,
            root_address: 0x1,
            target_address: 1,
            name: "spine".to_string(),
        }],
    );

    let config = AnalysisConfig::default();
    let mut snapshot = HeapSnapshot::new(1);
    Ingestor::new(&config)
        .ingest(&mut snapshot, &source)
        .expect("ingest");
    RootDiscovery::discover(&mut snapshot, &source);
    (snapshot, source)
}

fn bench_dominators(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("dominator_tree");

    for &n in &[1_000u64, 10_000, 50_000] {
        let (snapshot, _source) = synthetic_snapshot(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &snapshot, |b, snapshot| {
            b.iter(|| {
                let outcome = LengauerTarjanBuilder::new(snapshot, &config)
                    .build()
                    .expect("build");
                match outcome {
                    DominatorOutcome::Built(tree) => black_box(tree.reachable_count()),
                    DominatorOutcome::SkippedTooLarge { node_count } => black_box(node_count),
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dominators);
criterion_main!(benches);
