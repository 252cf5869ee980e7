use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use avl_dict::AvlTree;

const N: usize = 100_000;

pub fn benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<i32> = (1..=N).map(|_| rng.gen()).collect();

    c.bench_function("tree_insert", |b| {
        let mut tree = AvlTree::new();
        b.iter(|| {
            for value in &values {
                tree.insert(*value, *value);
            }
        })
    });

    let mut tree = AvlTree::new();
    for value in &values {
        tree.insert(*value, *value);
    }

    c.bench_function("tree_find", |b| {
        b.iter(|| {
            for value in &values {
                black_box(tree.find(value));
            }
        })
    });

    c.bench_function("tree_iter", |b| {
        b.iter(|| {
            for (k, v) in &tree {
                black_box((k, v));
            }
        })
    });

    c.bench_function("tree_remove", |b| {
        let mut tree = tree.clone();
        b.iter(|| {
            for value in &values {
                tree.remove(value);
            }
        })
    });

    let other: AvlTree<i32, i32> = (1..=N).map(|_| rng.gen()).map(|value| (value, value)).collect();

    c.bench_function("tree_merge", |b| {
        b.iter(|| {
            let mut merged = tree.clone();
            merged.merge(&other);
            black_box(merged.len())
        })
    });
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
