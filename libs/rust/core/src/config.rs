//! Run configuration: defaults, layered loading (file + environment) and fail-fast validation.

use crate::error::{CoverageError, Result};
use crate::geometry::Area;
use crate::obstacle::ObstacleSpec;
use crate::optimizer::OptimizerKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_PREFIX: &str = "COVERAGE";
pub const CONFIG_FILE_ENV: &str = "COVERAGE_CONFIG_FILE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub area_length: u32,
    pub area_width: u32,
    pub station_count: usize,
    pub station_radius: f64,
    pub population_size: usize,
    pub max_iterations: usize,
    pub w: f64,
    pub c1: f64,
    pub c2: f64,
    /// Bottom share of the population (0-100) treated as weak (SE) and replaced by the GA.
    pub g_percent: u32,
    pub neighbor_count: usize,
    pub use_nep: bool,
    pub use_se: bool,
    /// Top share of the population (0-100) used as GA parents.
    pub elite_percent: f64,
    pub mutation_rate: f64,
    pub mutation_step: f64,
    pub use_obstacles: bool,
    pub obstacles: Vec<ObstacleSpec>,
    pub random_obstacles: Option<RandomObstacles>,
    pub avoidance: AvoidanceParams,
    /// SE dimensional-factor reduction per station near an obstacle.
    pub epsilon: f64,
    /// Weight of the optional obstacle-proximity fitness penalty; 0 disables it.
    pub fitness_penalty: f64,
    pub init_strategy: InitStrategy,
    pub seed: Option<u64>,
    pub parallel_evaluation: bool,
    pub experiment: ExperimentSettings,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            area_length: 50,
            area_width: 50,
            station_count: 50,
            station_radius: 5.0,
            population_size: 50,
            max_iterations: 200,
            w: 0.4,
            c1: 2.0,
            c2: 2.0,
            g_percent: 15,
            neighbor_count: 3,
            use_nep: true,
            use_se: true,
            elite_percent: 30.0,
            mutation_rate: 0.05,
            mutation_step: 1.0,
            use_obstacles: false,
            obstacles: Vec::new(),
            random_obstacles: None,
            avoidance: AvoidanceParams::default(),
            epsilon: 0.05,
            fitness_penalty: 0.0,
            init_strategy: InitStrategy::default(),
            seed: None,
            parallel_evaluation: false,
            experiment: ExperimentSettings::default(),
        }
    }
}

/// Obstacle repulsion: `strength` scales the force, `range` is a multiple of each obstacle's
/// effective radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceParams {
    pub strength: f64,
    pub range: f64,
}

impl Default for AvoidanceParams { fn default() -> Self { Self { strength: 1.0, range: 2.0 } } }

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomObstacles {
    pub count: usize,
    pub vertex_count: usize,
    pub max_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitStrategy {
    #[default]
    Uniform,
    Clustered { cluster_count: usize },
    MinDistance { min_distance: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentSettings {
    pub variants: Vec<OptimizerKind>,
    pub output_dir: PathBuf,
    pub initial_positions_file: Option<PathBuf>,
    pub auto_save_initial: bool,
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        Self {
            variants: vec![OptimizerKind::Pso, OptimizerKind::Ecppso, OptimizerKind::EcppsoGa],
            output_dir: PathBuf::from("data"),
            initial_positions_file: None,
            auto_save_initial: true,
        }
    }
}

impl OptimizerConfig {
    pub fn area(&self) -> Area { Area::new(self.area_length, self.area_width) }

    /// Maximum per-station speed.
    pub fn vmax(&self) -> f64 { self.station_radius }

    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: impl Into<String>) -> Result<()> { Err(CoverageError::InvalidConfig(msg.into())) }
        if self.area_length == 0 || self.area_width == 0 { return invalid("area length and width must be positive"); }
        if self.station_count == 0 { return invalid("station_count must be positive"); }
        if !(self.station_radius.is_finite() && self.station_radius > 0.0) { return invalid("station_radius must be a positive number"); }
        if self.population_size == 0 { return invalid("population_size must be positive"); }
        if self.max_iterations == 0 { return invalid("max_iterations must be positive"); }
        if ![self.w, self.c1, self.c2, self.epsilon, self.avoidance.strength, self.avoidance.range, self.fitness_penalty].iter().all(|v| v.is_finite()) {
            return invalid("coefficients must be finite");
        }
        if self.g_percent > 100 { return invalid("g_percent must be within 0-100"); }
        if !(0.0..=100.0).contains(&self.elite_percent) { return invalid("elite_percent must be within 0-100"); }
        if !(0.0..=1.0).contains(&self.mutation_rate) { return invalid("mutation_rate must be within 0-1"); }
        if !(self.mutation_step.is_finite() && self.mutation_step >= 0.0) { return invalid("mutation_step must be >= 0"); }
        if self.avoidance.range < 0.0 { return invalid("avoidance.range must be >= 0"); }
        match self.init_strategy {
            InitStrategy::Clustered { cluster_count: 0 } => return invalid("cluster_count must be positive"),
            InitStrategy::MinDistance { min_distance } if !(min_distance.is_finite() && min_distance >= 0.0) => {
                return invalid("min_distance must be >= 0")
            }
            _ => {}
        }
        if let Some(r) = &self.random_obstacles {
            if r.vertex_count < 3 { return invalid("random_obstacles.vertex_count must be at least 3"); }
            if !(r.max_size.is_finite() && r.max_size > 0.0) { return invalid("random_obstacles.max_size must be positive"); }
        }
        Ok(())
    }
}

/// Layered load: optional file (explicit `path`, else `COVERAGE_CONFIG_FILE`), then `COVERAGE__*`
/// environment overrides. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<OptimizerConfig> {
    let mut builder = config::Config::builder();
    if let Some(p) = path {
        builder = builder.add_source(config::File::from(p).required(true));
    } else if let Ok(file) = std::env::var(CONFIG_FILE_ENV) {
        builder = builder.add_source(config::File::with_name(&file).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true));
    let cfg: OptimizerConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    debug!(?cfg, "configuration loaded");
    Ok(cfg)
}

/// Parses a configuration document in the given format (no environment layering).
pub fn load_config_str(text: &str, format: config::FileFormat) -> Result<OptimizerConfig> {
    let cfg: OptimizerConfig = config::Config::builder()
        .add_source(config::File::from_str(text, format))
        .build()?
        .try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = OptimizerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.vmax(), 5.0);
        assert_eq!(cfg.area().cell_count(), 2500);
    }

    #[test]
    fn rejects_non_positive_inputs() {
        let bad = [
            OptimizerConfig { area_length: 0, ..Default::default() },
            OptimizerConfig { station_count: 0, ..Default::default() },
            OptimizerConfig { station_radius: -1.0, ..Default::default() },
            OptimizerConfig { population_size: 0, ..Default::default() },
            OptimizerConfig { g_percent: 101, ..Default::default() },
            OptimizerConfig { mutation_rate: 1.5, ..Default::default() },
            OptimizerConfig { mutation_step: -0.1, ..Default::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(CoverageError::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[test]
    fn yaml_overrides_defaults() {
        let text = r#"
area_length: 20
area_width: 30
station_count: 5
station_radius: 4.0
population_size: 10
use_obstacles: true
obstacles:
  - kind: circle
    center: { x: 1.0, y: 2.0 }
    radius: 3.0
init_strategy:
  kind: clustered
  cluster_count: 2
experiment:
  variants: [pso, ga]
"#;
        let cfg = load_config_str(text, config::FileFormat::Yaml).unwrap();
        assert_eq!(cfg.area(), Area::new(20, 30));
        assert_eq!(cfg.population_size, 10);
        assert_eq!(cfg.w, 0.4);
        assert_eq!(cfg.obstacles.len(), 1);
        assert_eq!(cfg.init_strategy, InitStrategy::Clustered { cluster_count: 2 });
        assert_eq!(cfg.experiment.variants, vec![OptimizerKind::Pso, OptimizerKind::Ga]);
    }

    #[test]
    fn invalid_document_fails_fast() {
        let err = load_config_str("station_count: 0\n", config::FileFormat::Yaml).unwrap_err();
        assert!(err.to_string().contains("station_count"));
    }
}
