//! Benchmarks for the treap algorithms and the collection built on them.
//!
//! Compares Collection against the standard BTreeMap for point operations.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kvtreap::treap::{
    DiscardReclaimer, Item, MemoryStore, NodeLoc, ReclaimLedger, TreapOps, VisitChoice,
    bytewise_compare,
};
use kvtreap::{Collection, CollectionOptions, ReadItems};
use std::collections::BTreeMap;
use std::hint::black_box;
use std::sync::Arc;

fn key(index: u32) -> [u8; 4] {
    index.to_be_bytes()
}

fn build_treap(store: &MemoryStore, range: std::ops::Range<u32>) -> NodeLoc {
    let operations = TreapOps::new(store, &DiscardReclaimer, bytewise_compare);
    range.fold(NodeLoc::Empty, |root, index| {
        let single = operations.singleton(Arc::new(Item::new(&key(index), b"value")));
        operations.union(&root, &single).unwrap_or(root)
    })
}

// =============================================================================
// union Benchmark
// =============================================================================

fn benchmark_union(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("union");

    for size in [100, 1000, 10000] {
        let store = MemoryStore::new();
        let lower = build_treap(&store, 0..size);
        let shifted = build_treap(&store, size / 2..size + size / 2);

        group.bench_with_input(
            BenchmarkId::new("overlapping", size),
            &size,
            |bencher, _| {
                let operations = TreapOps::new(&store, &DiscardReclaimer, bytewise_compare);
                bencher.iter(|| black_box(operations.union(&lower, &shifted)));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("overlapping_with_ledger", size),
            &size,
            |bencher, _| {
                bencher.iter(|| {
                    let ledger = ReclaimLedger::new();
                    let operations = TreapOps::new(&store, &ledger, bytewise_compare);
                    let merged = operations.union(&lower, &shifted);
                    black_box((merged, ledger.marked_count()))
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// split / join Benchmark
// =============================================================================

fn benchmark_split_join(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("split_join");

    for size in [100, 1000, 10000] {
        let store = MemoryStore::new();
        let tree = build_treap(&store, 0..size);
        let pivot = key(size / 2);

        group.bench_with_input(BenchmarkId::new("split", size), &size, |bencher, _| {
            let operations = TreapOps::new(&store, &DiscardReclaimer, bytewise_compare);
            bencher.iter(|| black_box(operations.split(&tree, black_box(&pivot))));
        });

        group.bench_with_input(
            BenchmarkId::new("split_then_join", size),
            &size,
            |bencher, _| {
                let operations = TreapOps::new(&store, &DiscardReclaimer, bytewise_compare);
                bencher.iter(|| {
                    let joined = operations
                        .split(&tree, black_box(&pivot))
                        .and_then(|split| operations.join(&split.left, &split.right));
                    black_box(joined)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// set Benchmark
// =============================================================================

fn benchmark_set(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("set");

    for size in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::new("Collection", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let collection = Collection::new();
                for index in 0..size {
                    let _ = collection.set(black_box(&key(index)), b"value");
                }
                black_box(collection)
            });
        });

        group.bench_with_input(
            BenchmarkId::new("Collection_without_recycling", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let collection = Collection::with_options(
                        CollectionOptions::default().with_recycle_capacity(0),
                    );
                    for index in 0..size {
                        let _ = collection.set(black_box(&key(index)), b"value");
                    }
                    black_box(collection)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut map = BTreeMap::new();
                for index in 0..size {
                    map.insert(black_box(key(index)), b"value".to_vec());
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

// =============================================================================
// get Benchmark
// =============================================================================

fn benchmark_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("get");

    for size in [100, 1000, 10000] {
        let collection = Collection::new();
        let mut standard_map = BTreeMap::new();
        for index in 0..size {
            let _ = collection.set(&key(index), b"value");
            standard_map.insert(key(index), b"value".to_vec());
        }

        group.bench_with_input(BenchmarkId::new("Collection", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut found = 0;
                for index in 0..size {
                    if let Ok(Some(_)) = collection.get(black_box(&key(index)), true) {
                        found += 1;
                    }
                }
                black_box(found)
            });
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut found = 0;
                for index in 0..size {
                    if standard_map.get(black_box(&key(index))).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            });
        });
    }

    group.finish();
}

// =============================================================================
// visit Benchmark
// =============================================================================

fn benchmark_visit(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("visit");

    for size in [100, 1000, 10000] {
        let store = MemoryStore::new();
        let tree = build_treap(&store, 0..size);
        let collection = Collection::new();
        for index in 0..size {
            let _ = collection.set(&key(index), b"value");
        }

        group.bench_with_input(BenchmarkId::new("visit_nodes", size), &size, |bencher, _| {
            let operations = TreapOps::new(&store, &DiscardReclaimer, bytewise_compare);
            bencher.iter(|| {
                let mut total = 0usize;
                let mut visitor = |item: &Arc<Item>, _depth: u64| {
                    total += item.key().len();
                    true
                };
                let outcome = operations.visit_nodes(
                    &tree,
                    b"",
                    false,
                    &mut visitor,
                    0,
                    &VisitChoice::ascending,
                );
                black_box((outcome, total))
            });
        });

        group.bench_with_input(
            BenchmarkId::new("snapshot_ascend", size),
            &size,
            |bencher, _| {
                bencher.iter(|| {
                    let snapshot = collection.snapshot();
                    let mut total = 0usize;
                    let outcome = snapshot.visit_items_ascend(b"", false, |item| {
                        total += item.key().len();
                        true
                    });
                    black_box((outcome, total))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_union,
    benchmark_split_join,
    benchmark_set,
    benchmark_get,
    benchmark_visit
);

criterion_main!(benches);
