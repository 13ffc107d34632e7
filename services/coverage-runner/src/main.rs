use anyhow::{Context, Result};
use coverage_core::experiment::{fitness_report, runtime_report, run_variant, RunSummary};
use coverage_core::{init_tracing, load_config, InitialPositions, OptimizerConfig, RunContext};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

const INITIAL_POSITIONS_FILE: &str = "initial_positions.json";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("coverage-runner")?;
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path.as_deref()).context("loading configuration")?;
    info!(target: "coverage-runner", variants = ?cfg.experiment.variants, "Starting coverage experiment");

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!(target: "coverage-runner", "interrupt received, finishing current iteration");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let context = Arc::new(prepare_context(cfg)?);
    let mut runs = Vec::new();
    for kind in context.config.experiment.variants.clone() {
        if stop.load(Ordering::SeqCst) { break; }
        let (ctx, stop) = (context.clone(), stop.clone());
        let run = tokio::task::spawn_blocking(move || run_variant(&ctx, kind, &stop)).await??;
        info!(
            target: "coverage-runner",
            optimizer = %kind,
            best_coverage = run.best_coverage,
            best_iteration = run.best_iteration,
            "variant complete"
        );
        runs.push(run);
    }

    write_reports(&context.config.experiment.output_dir, &runs)?;
    if let Some(best) = runs.iter().max_by(|a, b| a.best_coverage.total_cmp(&b.best_coverage)) {
        info!(
            target: "coverage-runner",
            optimizer = %best.kind,
            coverage = best.best_coverage,
            iteration = best.best_iteration,
            solution = %serde_json::to_string(&best.best_solution)?,
            "best layout"
        );
    }
    Ok(())
}

/// Builds the run context and pins the starting population: loaded from the configured file
/// when it exists, otherwise generated once and saved for later reruns.
fn prepare_context(cfg: OptimizerConfig) -> Result<RunContext> {
    let settings = cfg.experiment.clone();
    let target = settings.initial_positions_file.clone().unwrap_or_else(|| settings.output_dir.join(INITIAL_POSITIONS_FILE));
    let mut context = RunContext::new(cfg)?;

    match settings.initial_positions_file.as_deref().filter(|p| p.exists()) {
        Some(path) => {
            let positions = InitialPositions::load(path).with_context(|| format!("reading {}", path.display()))?;
            info!(target: "coverage-runner", path = %path.display(), groups = positions.group_count(), "initial positions loaded");
            context = context.with_initial_positions(positions)?;
        }
        None => {
            context = context.freeze_initial_positions();
            if settings.auto_save_initial {
                if let Some(positions) = &context.initial_positions {
                    positions.save(&target)?;
                    info!(target: "coverage-runner", path = %target.display(), "initial positions saved");
                }
            }
        }
    }
    Ok(context)
}

fn write_reports(dir: &Path, runs: &[RunSummary]) -> Result<()> {
    if runs.is_empty() {
        warn!(target: "coverage-runner", "no completed runs, skipping reports");
        return Ok(());
    }
    fitness_report(runs).write(&dir.join("fitness.csv"))?;
    runtime_report(runs).write(&dir.join("runtime.csv"))?;
    info!(target: "coverage-runner", dir = %dir.display(), "reports written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverage_core::OptimizerKind;

    fn config(dir: &Path) -> OptimizerConfig {
        let mut cfg = OptimizerConfig {
            area_length: 20, area_width: 20, station_count: 4, station_radius: 4.0,
            population_size: 6, max_iterations: 5, seed: Some(3), ..Default::default()
        };
        cfg.experiment.output_dir = dir.to_path_buf();
        cfg.experiment.variants = vec![OptimizerKind::Pso, OptimizerKind::EcppsoGa];
        cfg
    }

    #[test]
    fn generated_positions_are_saved_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let first = prepare_context(config(dir.path())).unwrap();
        let saved = dir.path().join(INITIAL_POSITIONS_FILE);
        assert!(saved.exists());

        let mut cfg = config(dir.path());
        cfg.experiment.initial_positions_file = Some(saved);
        let second = prepare_context(cfg).unwrap();
        assert_eq!(first.initial_positions, second.initial_positions);
    }

    #[test]
    fn reports_land_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = prepare_context(config(dir.path())).unwrap();
        let stop = AtomicBool::new(false);
        let runs: Vec<RunSummary> = ctx.config.experiment.variants.iter().map(|k| run_variant(&ctx, *k, &stop).unwrap()).collect();
        write_reports(dir.path(), &runs).unwrap();
        let fitness = std::fs::read_to_string(dir.path().join("fitness.csv")).unwrap();
        assert!(fitness.starts_with("Iteration,PSO,ECPPSO+GA\n"));
        assert_eq!(fitness.lines().count(), 6);
        assert!(dir.path().join("runtime.csv").exists());
    }
}
