/// Behavioral properties shared by every optimizer variant
/// Run with: cargo test --test optimizer_properties

use coverage_core::config::RandomObstacles;
use coverage_core::{initialize, CoverageError, ObstacleSpec, OptimizerConfig, OptimizerKind, RunContext, Vec2};

const ALL: [OptimizerKind; 5] = [
    OptimizerKind::Pso,
    OptimizerKind::PsoGa,
    OptimizerKind::Ecppso,
    OptimizerKind::EcppsoGa,
    OptimizerKind::Ga,
];

fn small_config() -> OptimizerConfig {
    OptimizerConfig {
        area_length: 20,
        area_width: 20,
        station_count: 5,
        station_radius: 4.0,
        population_size: 10,
        max_iterations: 50,
        seed: Some(2024),
        ..Default::default()
    }
}

#[test]
fn pso_end_to_end_improves_coverage() {
    let ctx = RunContext::new(small_config()).unwrap();
    let mut opt = initialize(&ctx, OptimizerKind::Pso).unwrap();
    let initial = opt.best_coverage();
    let mut series = Vec::new();
    for _ in 0..50 {
        opt.run_iteration();
        series.push(opt.best_coverage());
    }
    assert!(series.windows(2).all(|w| w[1] >= w[0]), "coverage regressed: {series:?}");
    assert!(series[49] > initial, "no improvement over {initial}");
    assert!(series[49] <= 100.0);
}

#[test]
fn shapes_and_bounds_hold_for_every_variant() {
    let cfg = small_config();
    let area = cfg.area();
    let ctx = RunContext::new(cfg.clone()).unwrap();
    for kind in ALL {
        let mut opt = initialize(&ctx, kind).unwrap();
        for _ in 0..25 {
            opt.run_iteration();
            let pop = opt.population();
            assert_eq!(pop.len(), cfg.population_size);
            for p in pop.iter() {
                assert_eq!(p.station_count(), cfg.station_count);
                assert!(p.is_consistent());
                assert!(p.pos.iter().all(|s| area.contains(*s)), "{kind} left the area");
                assert!(p.vel.iter().all(|v| v.length() <= cfg.vmax() + 1e-9), "{kind} exceeded vmax");
                assert!(p.p_best_fitness >= 0.0 && p.p_best_fitness <= 1.0);
            }
        }
        assert_eq!(opt.best_solution().len(), cfg.station_count);
    }
}

#[test]
fn global_best_never_decreases_with_obstacles() {
    let cfg = OptimizerConfig {
        use_obstacles: true,
        obstacles: vec![ObstacleSpec::Circle { center: Vec2::new(0.0, 0.0), radius: 3.0 }],
        random_obstacles: Some(RandomObstacles { count: 2, vertex_count: 6, max_size: 2.5 }),
        fitness_penalty: 0.1,
        ..small_config()
    };
    let ctx = RunContext::new(cfg).unwrap().freeze_initial_positions();
    for kind in ALL {
        let mut opt = initialize(&ctx, kind).unwrap();
        let mut last = opt.best_coverage();
        for _ in 0..20 {
            opt.run_iteration();
            assert!(opt.best_coverage() >= last);
            last = opt.best_coverage();
        }
    }
}

#[test]
fn single_particle_population_runs() {
    let cfg = OptimizerConfig { population_size: 1, ..small_config() };
    let ctx = RunContext::new(cfg).unwrap();
    for kind in ALL {
        let mut opt = initialize(&ctx, kind).unwrap();
        for _ in 0..5 { opt.run_iteration(); }
        assert_eq!(opt.population().len(), 1);
    }
}

#[test]
fn invalid_configuration_is_rejected() {
    for cfg in [
        OptimizerConfig { station_count: 0, ..small_config() },
        OptimizerConfig { station_radius: -1.0, ..small_config() },
        OptimizerConfig { area_width: 0, ..small_config() },
        OptimizerConfig { g_percent: 150, ..small_config() },
        OptimizerConfig { mutation_rate: 2.0, ..small_config() },
    ] {
        assert!(matches!(RunContext::new(cfg), Err(CoverageError::InvalidConfig(_))));
    }
}
