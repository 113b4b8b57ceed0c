//! Distance kernel and graph search benchmarks on synthetic vectors.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use unichrome::distance::{cosine_distance_scalar, cosine_distance_simd, dot_simd};
use unichrome::{Graph, Parameters};

fn random_unit(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    let raw: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    raw.iter().map(|x| x / norm).collect()
}

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_distance");
    let mut rng = StdRng::seed_from_u64(42);

    for dim in [64usize, 256, 768, 1536] {
        let a = random_unit(&mut rng, dim);
        let b = random_unit(&mut rng, dim);
        group.throughput(Throughput::Elements(dim as u64));

        group.bench_with_input(BenchmarkId::new("scalar", dim), &dim, |bench, _| {
            bench.iter(|| black_box(cosine_distance_scalar(black_box(&a), black_box(&b))));
        });
        group.bench_with_input(BenchmarkId::new("simd", dim), &dim, |bench, _| {
            bench.iter(|| black_box(cosine_distance_simd(black_box(&a), black_box(&b))));
        });
        group.bench_with_input(BenchmarkId::new("simd_units", dim), &dim, |bench, _| {
            bench.iter(|| black_box(1.0 - dot_simd(black_box(&a), black_box(&b))));
        });
    }
    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let dim = 64;
    let n = 5_000;
    let mut rng = StdRng::seed_from_u64(7);
    let items: Vec<Vec<f32>> = (0..n).map(|_| random_unit(&mut rng, dim)).collect();

    let mut group = c.benchmark_group("graph");
    group.sample_size(20);

    group.bench_function("build_5k_64d", |bench| {
        bench.iter(|| {
            let mut graph = Graph::new(Parameters::default());
            graph.add_items(black_box(items.clone())).unwrap();
            black_box(graph.len())
        });
    });

    let mut graph = Graph::new(Parameters::default());
    graph.add_items(items).unwrap();
    let queries: Vec<Vec<f32>> = (0..100).map(|_| random_unit(&mut rng, dim)).collect();

    group.bench_function("knn_k10_5k_64d", |bench| {
        let mut i = 0;
        bench.iter(|| {
            let q = &queries[i % queries.len()];
            i += 1;
            black_box(graph.k_nearest(black_box(q), 10).unwrap())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_kernels, bench_graph);
criterion_main!(benches);
