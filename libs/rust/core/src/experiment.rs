//! Experiment driver: runs optimizers to completion (or until stopped) and collects the
//! per-iteration coverage and timing series that end up in the CSV reports.

use crate::geometry::Vec2;
use crate::optimizer::{initialize, Optimizer, OptimizerKind, RunContext};
use crate::error::Result;
use crate::persistence::SeriesReport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of one optimizer run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub kind: OptimizerKind,
    /// Best coverage (%) after each completed iteration.
    pub coverage: Vec<f64>,
    /// Wall time of each iteration in milliseconds.
    pub runtime_ms: Vec<f64>,
    /// Global best layout after each completed iteration.
    pub solutions: Vec<Vec<Vec2>>,
    pub best_solution: Vec<Vec2>,
    pub best_coverage: f64,
    /// 1-based iteration at which `best_coverage` was first reached; 0 if no iteration ran.
    pub best_iteration: usize,
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn iterations(&self) -> usize { self.coverage.len() }
}

/// Drives `optimizer` for up to `max_iterations`, checking `stop` before every iteration.
pub fn run_to_completion(optimizer: &mut dyn Optimizer, max_iterations: usize, stop: &AtomicBool) -> RunSummary {
    let mut coverage = Vec::with_capacity(max_iterations);
    let mut runtime_ms = Vec::with_capacity(max_iterations);
    let mut solutions = Vec::with_capacity(max_iterations);
    let mut best_iteration = 0;
    let mut best = f64::NEG_INFINITY;
    let mut stopped_early = false;

    for iteration in 1..=max_iterations {
        if stop.load(Ordering::Relaxed) {
            warn!(optimizer = optimizer.name(), iteration, "stop requested, ending run early");
            stopped_early = true;
            break;
        }
        let started = Instant::now();
        optimizer.run_iteration();
        runtime_ms.push(started.elapsed().as_secs_f64() * 1000.0);
        let now = optimizer.best_coverage();
        if now > best {
            best = now;
            best_iteration = iteration;
        }
        coverage.push(now);
        solutions.push(optimizer.best_solution());
    }

    let summary = RunSummary {
        kind: optimizer.kind(),
        coverage,
        runtime_ms,
        solutions,
        best_solution: optimizer.best_solution(),
        best_coverage: optimizer.best_coverage(),
        best_iteration,
        stopped_early,
    };
    info!(
        optimizer = summary.kind.label(),
        iterations = summary.iterations(),
        best_coverage = summary.best_coverage,
        best_iteration = summary.best_iteration,
        "run finished"
    );
    summary
}

/// Initializes and runs `kind` against `context`.
pub fn run_variant(context: &RunContext, kind: OptimizerKind, stop: &AtomicBool) -> Result<RunSummary> {
    let mut optimizer = initialize(context, kind)?;
    Ok(run_to_completion(optimizer.as_mut(), context.config.max_iterations, stop))
}

/// Coverage series of each run, one column per optimizer.
pub fn fitness_report(runs: &[RunSummary]) -> SeriesReport {
    let mut report = SeriesReport::new();
    for run in runs { report.push_series(run.kind.label(), run.coverage.clone()); }
    report
}

/// Per-iteration runtime of each run, one column per optimizer.
pub fn runtime_report(runs: &[RunSummary]) -> SeriesReport {
    let mut report = SeriesReport::new();
    for run in runs { report.push_series(run.kind.label(), run.runtime_ms.clone()); }
    report
}
