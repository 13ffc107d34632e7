//! Station coverage placement optimization.
//!
//! Places N circular-coverage stations inside a rectangular area so that the share of covered
//! grid cells is maximal. Candidate layouts are evolved with particle swarm optimization, its
//! evolution-prediction variant (ECPPSO: Neighbor Evolution Prediction for the capable group,
//! Strengthening Evolution for the weak group), genetic hybridization of either, or a plain GA.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::prelude::*;

pub mod config;
pub mod error;
pub mod experiment;
pub mod fitness;
pub mod genetic;
pub mod geometry;
pub mod init;
pub mod obstacle;
pub mod optimizer;
pub mod particle;
pub mod persistence;
pub mod swarm;

pub use config::{load_config, OptimizerConfig};
pub use error::CoverageError;
pub use experiment::{run_to_completion, run_variant, RunSummary};
pub use fitness::CoverageEvaluator;
pub use geometry::{Area, Vec2};
pub use obstacle::{ObstacleField, ObstacleSpec};
pub use optimizer::{initialize, BestSolution, Optimizer, OptimizerKind, RunContext};
pub use persistence::{InitialPositions, SeriesReport};

pub const JSON_LOG_ENV: &str = "COVERAGE_JSON_LOG";

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber once per process. `RUST_LOG` filters (default `info`);
/// `COVERAGE_JSON_LOG=1|true` switches to flattened JSON events.
pub fn init_tracing(service: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let json = std::env::var(JSON_LOG_ENV).ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            registry
                .with(tracing_subscriber::fmt::layer().json().flatten_event(true).with_current_span(true).with_span_list(false))
                .try_init()?;
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_target(true).with_thread_ids(false).with_line_number(true))
                .try_init()?;
        }
        Ok(())
    })?;
    info!(target: "coverage", service, "tracing initialized");
    Ok(())
}
