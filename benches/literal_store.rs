//! Insert-vs-dedup throughput of `LiteralStore::find_or_create_from_utf8`
//! (spec.md section 8's testable properties, measured rather than asserted).

use compactjs::error::Span;
use compactjs::LiteralStore;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn distinct_strings(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("identifier_{i}")).collect()
}

fn bench_all_new_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_or_create_from_utf8/all_new");
    for size in [16usize, 256, 4096] {
        let strings = distinct_strings(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &strings, |b, strings| {
            b.iter(|| {
                let mut store = LiteralStore::new();
                for s in strings {
                    black_box(store.find_or_create_from_utf8(s.as_bytes(), Span::default()).unwrap());
                }
                store
            });
        });
    }
    group.finish();
}

fn bench_all_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_or_create_from_utf8/all_duplicates");
    for size in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut store = LiteralStore::new();
                for _ in 0..size {
                    black_box(store.find_or_create_from_utf8(b"repeated_identifier", Span::default()).unwrap());
                }
                store
            });
        });
    }
    group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_or_create_from_utf8/mixed");
    let distinct = distinct_strings(64);
    group.bench_function("64_distinct_interleaved_with_10_repeats_each", |b| {
        b.iter(|| {
            let mut store = LiteralStore::new();
            for _ in 0..10 {
                for s in &distinct {
                    black_box(store.find_or_create_from_utf8(s.as_bytes(), Span::default()).unwrap());
                }
            }
            store
        });
    });
    group.finish();
}

criterion_group!(benches, bench_all_new_strings, bench_all_duplicates, bench_mixed_workload);
criterion_main!(benches);
