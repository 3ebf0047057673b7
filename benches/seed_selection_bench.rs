use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use hillclimb::prelude::*;

// Synthetic directed graph with uniform edge probability.
fn random_graph(n: usize, avg_degree: usize, p: f32, seed: u64) -> CsrGraph {
    let mut rng = SmallRng::seed_from_u64(seed);
    let edges: Vec<(usize, usize, f32)> = (0..n * avg_degree)
        .map(|_| (rng.gen_range(0..n), rng.gen_range(0..n), p))
        .collect();
    CsrGraph::from_weighted_edges(n, &edges, false)
}

fn bench_seed_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("seed_selection");
    group.sample_size(10);
    for &n in &[500usize, 2_000] {
        let graph = random_graph(n, 4, 0.1, 7);
        let samples = IndependentCascade::new(3).sample(&graph, 32).unwrap();
        for &workers in &[1usize, 4] {
            let cfg = HillClimbingConfig {
                k: 4,
                cpu_workers: workers,
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("n{n}"), workers),
                &workers,
                |b, _| {
                    b.iter(|| {
                        let mut record = ExecutionRecord::default();
                        let window = SerialWindow::new(n);
                        seed_selection(&graph, &samples, &cfg, window, &mut record).unwrap()
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_seed_selection);
criterion_main!(benches);
