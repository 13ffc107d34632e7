/// File round-trips for initial positions and series reports
/// Run with: cargo test --test persistence_roundtrip

use coverage_core::experiment::{fitness_report, run_variant};
use coverage_core::{initialize, CoverageError, InitialPositions, OptimizerConfig, OptimizerKind, RunContext};
use std::sync::atomic::AtomicBool;

fn config() -> OptimizerConfig {
    OptimizerConfig {
        area_length: 16,
        area_width: 12,
        station_count: 3,
        station_radius: 3.0,
        population_size: 4,
        max_iterations: 8,
        seed: Some(11),
        ..Default::default()
    }
}

#[test]
fn saved_positions_reproduce_the_initial_population() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("initial_positions.json");

    let ctx = RunContext::new(config()).unwrap();
    let first = initialize(&ctx, OptimizerKind::Ecppso).unwrap();
    first.initial_positions().save(&path).unwrap();

    let loaded = InitialPositions::load(&path).unwrap();
    assert_eq!(&loaded, first.initial_positions());

    let replay = RunContext::new(OptimizerConfig { seed: None, ..config() })
        .unwrap()
        .with_initial_positions(loaded)
        .unwrap();
    let second = initialize(&replay, OptimizerKind::Ga).unwrap();
    for (a, b) in first.population().iter().zip(second.population().iter()) {
        assert_eq!(a.pos, b.pos);
        assert_eq!(a.fitness, b.fitness);
    }
}

#[test]
fn too_few_groups_fail_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.json");
    std::fs::write(&path, r#"{"positionGroups":[{"points":[{"x":0.0,"y":0.0},{"x":1.0,"y":1.0},{"x":2.0,"y":2.0}]}]}"#).unwrap();
    let loaded = InitialPositions::load(&path).unwrap();
    let err = RunContext::new(config()).unwrap().with_initial_positions(loaded).unwrap_err();
    assert!(matches!(err, CoverageError::InsufficientPositions { needed: 4, found: 1 }));
}

#[test]
fn malformed_json_is_a_serde_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(InitialPositions::load(&path), Err(CoverageError::Serde(_))));
    assert!(matches!(InitialPositions::load(&dir.path().join("missing.json")), Err(CoverageError::Io(_))));
}

#[test]
fn fitness_csv_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(config()).unwrap().freeze_initial_positions();
    let stop = AtomicBool::new(false);
    let runs = vec![
        run_variant(&ctx, OptimizerKind::Pso, &stop).unwrap(),
        run_variant(&ctx, OptimizerKind::EcppsoGa, &stop).unwrap(),
    ];
    let path = dir.path().join("fitness.csv");
    fitness_report(&runs).write(&path).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Iteration,PSO,ECPPSO+GA"));
    assert_eq!(lines.next().map(|l| l.starts_with("1,")), Some(true));
    assert_eq!(text.lines().count(), 9);
}
