//! Insert and search performance benchmarks.
//!
//! Exact KD-tree search degrades toward a linear scan as dimensionality
//! grows, so the suite tracks both the low-dimension sweet spot and the
//! embedding-sized worst case alongside raw insertion throughput.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use vicinity::{ContentHash, Dimensions, SearchOptions, VectorIndex, VectorRecord};

fn random_vector(rng: &mut StdRng, dims: usize) -> Vec<f32> {
    (0..dims).map(|_| rng.random_range(-1.0f32..1.0)).collect()
}

fn key_for(i: u32) -> ContentHash {
    let mut bytes = [0u8; 20];
    bytes[..4].copy_from_slice(&i.to_le_bytes());
    ContentHash::from_bytes(bytes)
}

fn make_records(count: usize, dims: usize, seed: u64) -> Vec<VectorRecord<ContentHash>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| VectorRecord::new(random_vector(&mut rng, dims), key_for(i as u32)))
        .collect()
}

fn build_index(count: usize, dims: usize, seed: u64) -> VectorIndex<ContentHash> {
    let mut index = VectorIndex::new(Dimensions::new(dims).expect("valid dimensions"));
    for record in make_records(count, dims, seed) {
        index.insert(record).expect("insert should succeed");
    }
    index
}

/// Benchmark insertion throughput on randomly ordered vectors
fn bench_insert_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_throughput");
    let dims = 16;

    for count in [1_000, 10_000] {
        let records = make_records(count, dims, 42);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(
            BenchmarkId::new("insert_random", count),
            &records,
            |b, records| {
                b.iter(|| {
                    let mut index =
                        VectorIndex::new(Dimensions::new(dims).expect("valid dimensions"));
                    for record in records {
                        index.insert(record.clone()).expect("insert should succeed");
                    }
                    black_box(index.len())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark top-10 search at increasing index sizes
fn bench_search_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_scaling");
    let dims = 16;

    for count in [1_000, 10_000, 100_000] {
        let index = build_index(count, dims, 42);
        let mut rng = StdRng::seed_from_u64(7);
        let targets: Vec<_> = (0..16).map(|_| random_vector(&mut rng, dims)).collect();
        let options = SearchOptions::default().with_limit(10);

        group.throughput(Throughput::Elements(targets.len() as u64));
        group.bench_with_input(BenchmarkId::new("find_top_10", count), &index, |b, index| {
            b.iter(|| {
                for target in &targets {
                    let results = index
                        .find_with_distance(black_box(target), &options)
                        .expect("search should succeed");
                    black_box(results.len());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark search cost across dimensionality at a fixed index size
fn bench_search_dimensionality(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_dimensionality");
    let count = 10_000;

    for dims in [4, 32, 384] {
        let index = build_index(count, dims, 42);
        let mut rng = StdRng::seed_from_u64(7);
        let target = random_vector(&mut rng, dims);
        let options = SearchOptions::default().with_limit(10);

        group.bench_with_input(BenchmarkId::new("find_top_10", dims), &index, |b, index| {
            b.iter(|| {
                let results = index
                    .find_with_distance(black_box(&target), &options)
                    .expect("search should succeed");
                black_box(results.len())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_throughput,
    bench_search_scaling,
    bench_search_dimensionality
);
criterion_main!(benches);
