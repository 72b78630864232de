//! Amplitude Operator Benchmarks
//!
//! Measures the per-round cost drivers of the protocol: repeated
//! amplification of one agent vector and confidence-weighted fusion of a
//! whole population's broadcast.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::time::Duration;

use brqc_core::amplitude::{amplify_n, fuse, uniform};
use brqc_core::{AdversaryModel, AgentId, ByzantineStrategy};

/// Broadcast snapshot for a mixed population: honest agents uniform,
/// byzantine agents drawing seeded random vectors
fn generate_broadcast(
    n_agents: usize,
    n_byzantine: usize,
    dim: usize,
) -> (BTreeMap<AgentId, Vec<num_complex::Complex64>>, BTreeMap<AgentId, f64>) {
    let mut adversary = AdversaryModel::with_seed(ByzantineStrategy::Random, dim, 0, 42);
    let mut states = BTreeMap::new();
    let mut weights = BTreeMap::new();
    for id in 0..n_agents {
        if id < n_byzantine {
            states.insert(id, adversary.transmit());
            weights.insert(id, 0.4);
        } else {
            states.insert(id, uniform(dim));
            weights.insert(id, 1.0);
        }
    }
    (states, weights)
}

fn bench_amplify(c: &mut Criterion) {
    let mut group = c.benchmark_group("amplify_n");
    group.measurement_time(Duration::from_secs(5));

    for dim in [20usize, 100, 500].iter() {
        let vector = uniform(*dim);
        group.bench_with_input(BenchmarkId::from_parameter(dim), &vector, |b, vector| {
            b.iter(|| amplify_n(black_box(vector), 0, 10));
        });
    }
    group.finish();
}

fn bench_fuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuse_population");
    group.measurement_time(Duration::from_secs(5));

    for n_agents in [10usize, 50, 100].iter() {
        let (states, weights) = generate_broadcast(*n_agents, n_agents / 4, 20);
        group.bench_with_input(
            BenchmarkId::from_parameter(n_agents),
            &(states, weights),
            |b, (states, weights)| {
                b.iter(|| fuse(black_box(states), black_box(weights), 20));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_amplify, bench_fuse);
criterion_main!(benches);
