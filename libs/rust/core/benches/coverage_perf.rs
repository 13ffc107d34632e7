/// Performance benchmarks for coverage placement
///
/// Benchmarks:
/// 1. Coverage grid scan for a full layout
/// 2. One optimizer iteration per variant
///
/// Run with: cargo bench --bench coverage_perf

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use coverage_core::{initialize, Area, CoverageEvaluator, OptimizerConfig, OptimizerKind, RunContext};
use rand::{rngs::StdRng, SeedableRng};

fn bench_covered_cells(c: &mut Criterion) {
    let mut group = c.benchmark_group("covered_cells");
    for stations in [10usize, 50, 200] {
        let area = Area::new(100, 100);
        let evaluator = CoverageEvaluator::new(area, 5.0);
        let mut rng = StdRng::seed_from_u64(7);
        let layout: Vec<_> = (0..stations).map(|_| area.sample(&mut rng)).collect();
        group.throughput(Throughput::Elements(stations as u64));
        group.bench_with_input(BenchmarkId::from_parameter(stations), &layout, |b, layout| {
            b.iter(|| black_box(evaluator.covered_cells(black_box(layout))));
        });
    }
    group.finish();
}

fn bench_iteration(c: &mut Criterion) {
    let ctx = RunContext::new(OptimizerConfig { seed: Some(1), ..Default::default() })
        .expect("default config is valid")
        .freeze_initial_positions();
    let mut group = c.benchmark_group("run_iteration");
    group.sample_size(20);
    for kind in [OptimizerKind::Pso, OptimizerKind::Ecppso, OptimizerKind::EcppsoGa, OptimizerKind::Ga] {
        let mut optimizer = initialize(&ctx, kind).expect("optimizer initializes");
        group.bench_function(kind.label(), |b| b.iter(|| optimizer.run_iteration()));
    }
    group.finish();
}

criterion_group!(benches, bench_covered_cells, bench_iteration);
criterion_main!(benches);
