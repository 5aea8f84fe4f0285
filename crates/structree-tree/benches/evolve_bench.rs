//! Benchmarks for the growth engine.
//!
//! Run with: cargo bench -p structree-tree

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use structree_core::Rational;
use structree_tree::{GrowthTree, Structor};

fn r(numerator: i64, denominator: i64) -> Rational {
    Rational::new(numerator, denominator).expect("bench rational must be valid")
}

fn demo_structors() -> [Structor; 2] {
    [
        Structor::new(r(1, 2), r(6, 1)),
        Structor::new(r(1, 4), r(-6, 1)),
    ]
}

fn looped_tree(iterations: usize) -> GrowthTree {
    let structors = demo_structors();
    let mut tree = GrowthTree::new(Rational::ONE).expect("tree");
    for _ in 0..iterations {
        tree.apply_all(&structors).expect("evolve");
    }
    tree
}

fn bench_evolve_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth/evolve_loop");
    let structors = demo_structors();

    for iterations in [1usize, 2, 3, 4] {
        group.bench_with_input(
            BenchmarkId::new("grow_shrink", iterations),
            &iterations,
            |b, &iterations| {
                b.iter_batched(
                    || GrowthTree::new(Rational::ONE).expect("tree"),
                    |mut tree| {
                        for _ in 0..iterations {
                            tree.apply_all(&structors).expect("evolve");
                        }
                        black_box(tree)
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_single_structor(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth/single_structor");

    for magnitude in [1i64, 6, 24] {
        let structor = Structor::new(r(1, 2), r(magnitude, 1));
        group.bench_with_input(
            BenchmarkId::new("half_rate", magnitude),
            &structor,
            |b, structor| {
                b.iter_batched(
                    || GrowthTree::new(Rational::ONE).expect("tree"),
                    |mut tree| {
                        tree.apply(structor).expect("evolve");
                        black_box(tree)
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth/snapshot");
    let tree = looped_tree(4);

    group.bench_function("to_snapshot", |b| b.iter(|| black_box(tree.to_snapshot())));
    group.bench_function("state_hash", |b| b.iter(|| black_box(tree.state_hash())));
    group.bench_function("validate", |b| b.iter(|| black_box(tree.validate())));

    group.finish();
}

criterion_group!(
    benches,
    bench_evolve_loop,
    bench_single_structor,
    bench_snapshot
);
criterion_main!(benches);
