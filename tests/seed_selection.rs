use hillclimb::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn chain4() -> CsrGraph {
    CsrGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3)])
}

fn select(
    graph: &CsrGraph,
    samples: &[EdgeMask],
    cfg: &HillClimbingConfig,
) -> Result<(Vec<usize>, ExecutionRecord), SeedSelectionError> {
    let mut record = ExecutionRecord::default();
    let window = SerialWindow::new(BlockPartition::new(graph.num_vertices(), 1).block_size());
    let seeds = seed_selection(graph, samples, cfg, window, &mut record)?;
    Ok((seeds, record))
}

fn random_graph(n: usize, edges: usize, seed: u64) -> CsrGraph {
    let mut rng = SmallRng::seed_from_u64(seed);
    let list: Vec<(usize, usize, f32)> = (0..edges)
        .map(|_| (rng.gen_range(0..n), rng.gen_range(0..n), 0.3))
        .collect();
    CsrGraph::from_weighted_edges(n, &list, false)
}

#[test]
fn chain_all_live_k1_picks_head() {
    let g = chain4();
    let cfg = HillClimbingConfig {
        k: 1,
        cpu_workers: 3,
        ..Default::default()
    };
    let (seeds, record) = select(&g, &[EdgeMask::full(3)], &cfg).unwrap();
    assert_eq!(seeds, vec![0]);
    assert_eq!(record.rounds.len(), 1);
    assert_eq!(record.epochs, 1);
}

#[test]
fn chain_all_live_k2_adds_lowest_covered_vertex() {
    // Round 2: 1, 2 and 3 are all covered by 0 and tie at the base count.
    let g = chain4();
    let cfg = HillClimbingConfig {
        k: 2,
        cpu_workers: 2,
        gpu_workers: 1,
        ..Default::default()
    };
    let (seeds, record) = select(&g, &[EdgeMask::full(3)], &cfg).unwrap();
    assert_eq!(seeds, vec![0, 1]);
    assert_eq!(record.selection_order(), vec![0, 1]);
    assert_eq!(
        record.rounds.iter().map(|r| r.score).collect::<Vec<_>>(),
        vec![4, 4]
    );
}

#[test]
fn repeated_runs_are_identical() {
    let g = random_graph(60, 180, 3);
    let samples = IndependentCascade::new(11).sample(&g, 24).unwrap();
    let cfg = HillClimbingConfig {
        k: 6,
        cpu_workers: 4,
        gpu_workers: 2,
        ..Default::default()
    };
    let (a, ra) = select(&g, &samples, &cfg).unwrap();
    let (b, rb) = select(&g, &samples, &cfg).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        ra.rounds.iter().map(|r| r.score).collect::<Vec<_>>(),
        rb.rounds.iter().map(|r| r.score).collect::<Vec<_>>()
    );
    let mut uniq = a.clone();
    uniq.sort_unstable();
    uniq.dedup();
    assert_eq!(uniq.len(), 6);
}

#[test]
fn worker_count_does_not_change_the_answer() {
    let g = random_graph(40, 120, 9);
    let samples = IndependentCascade::new(5).sample(&g, 16).unwrap();
    let base = HillClimbingConfig {
        k: 4,
        cpu_workers: 1,
        ..Default::default()
    };
    let (one, _) = select(&g, &samples, &base).unwrap();
    for (cpu, gpu) in [(8, 0), (0, 3), (3, 3)] {
        let cfg = HillClimbingConfig {
            cpu_workers: cpu,
            gpu_workers: gpu,
            ..base.clone()
        };
        let (other, _) = select(&g, &samples, &cfg).unwrap();
        assert_eq!(one, other, "cpu = {cpu}, gpu = {gpu}");
    }
}

#[test]
fn winner_scores_never_decrease() {
    // Every candidate scores at least the spread of the current seed set,
    // which is the previous winner's score.
    let g = random_graph(50, 150, 21);
    let samples = IndependentCascade::new(2).sample(&g, 20).unwrap();
    let cfg = HillClimbingConfig {
        k: 5,
        cpu_workers: 2,
        ..Default::default()
    };
    let (_, record) = select(&g, &samples, &cfg).unwrap();
    let scores: Vec<i64> = record.rounds.iter().map(|r| r.score).collect();
    assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{scores:?}");
}

#[test]
fn hill_climbing_draws_samples_then_selects() {
    // Star: hub 0 reaches everything with certainty.
    let edges: Vec<(usize, usize, f32)> = (1..10).map(|v| (0, v, 1.0)).collect();
    let g = CsrGraph::from_weighted_edges(10, &edges, false);
    let cfg = HillClimbingConfig {
        k: 1,
        samples: 8,
        cpu_workers: 2,
        ..Default::default()
    };
    let mut record = ExecutionRecord::default();
    let seeds = hill_climbing(
        &g,
        &cfg,
        &IndependentCascade::new(cfg.seed),
        SerialWindow::new(10),
        &mut record,
    )
    .unwrap();
    assert_eq!(seeds, vec![0]);
    assert_eq!(record.rounds[0].score, 80);
}

#[test]
fn hill_climbing_rejects_config_before_sampling() {
    let g = chain4();
    let cfg = HillClimbingConfig {
        k: 1,
        samples: 0,
        cpu_workers: 1,
        ..Default::default()
    };
    let mut record = ExecutionRecord::default();
    let res = hill_climbing(
        &g,
        &cfg,
        &IndependentCascade::new(cfg.seed),
        SerialWindow::new(4),
        &mut record,
    );
    assert_eq!(res, Err(SeedSelectionError::NoSamples { rank: 0 }));
    assert_eq!(record.sampling, std::time::Duration::ZERO);
    assert!(record.rounds.is_empty());

    let greedy = HillClimbingConfig {
        k: 5,
        samples: 4,
        ..cfg
    };
    let res = hill_climbing(
        &g,
        &greedy,
        &IndependentCascade::new(greedy.seed),
        SerialWindow::new(4),
        &mut record,
    );
    assert_eq!(res, Err(SeedSelectionError::TooManySeeds { k: 5, vertices: 4 }));
}

#[test]
fn record_serializes_to_json() {
    let g = chain4();
    let cfg = HillClimbingConfig {
        k: 1,
        cpu_workers: 1,
        ..Default::default()
    };
    let (_, record) = select(&g, &[EdgeMask::full(3)], &cfg).unwrap();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["epochs"], 1);
    assert_eq!(json["rounds"][0]["seed"], 0);
}
