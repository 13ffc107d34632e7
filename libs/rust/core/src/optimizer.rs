//! Optimizer orchestration.
//!
//! Every variant exposes the same four operations: construction (`initialize`), one
//! synchronous `run_iteration`, `best_solution` and `best_coverage`. Variants only differ in the
//! swarm update policy and whether the genetic module runs; each run owns its population,
//! global best and RNG, so instances never share state.

use crate::config::OptimizerConfig;
use crate::error::Result;
use crate::fitness::{CoverageEvaluator, ProximityPenalty};
use crate::genetic::GeneticOperator;
use crate::geometry::{Area, Vec2};
use crate::init::LayoutGenerator;
use crate::obstacle::{generate_convex_polygon, ObstacleField, ObstacleSpec};
use crate::particle::{Particle, Population};
use crate::persistence::InitialPositions;
use crate::swarm::{SwarmEngine, UpdatePolicy};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Pso,
    PsoGa,
    Ecppso,
    EcppsoGa,
    Ga,
}

impl OptimizerKind {
    pub fn label(&self) -> &'static str {
        match self {
            OptimizerKind::Pso => "PSO",
            OptimizerKind::PsoGa => "PSO+GA",
            OptimizerKind::Ecppso => "ECPPSO",
            OptimizerKind::EcppsoGa => "ECPPSO+GA",
            OptimizerKind::Ga => "GA",
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// Everything a run needs, fixed before optimization starts.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: OptimizerConfig,
    pub obstacles: ObstacleField,
    pub initial_positions: Option<InitialPositions>,
}

impl RunContext {
    /// Validates `config` and builds the obstacle field (configured plus randomly generated
    /// polygons) when obstacles are enabled.
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        let obstacles = if config.use_obstacles {
            let mut specs: Vec<ObstacleSpec> = config.obstacles.clone();
            if let Some(r) = config.random_obstacles {
                let mut rng = seeded_rng(config.seed.map(|s| s ^ 0x0b57_ac1e));
                let area = config.area();
                specs.extend((0..r.count).map(|_| generate_convex_polygon(&mut rng, &area, r.vertex_count, r.max_size)));
            }
            ObstacleField::new(specs)
        } else {
            ObstacleField::empty()
        };
        Ok(Self { config, obstacles, initial_positions: None })
    }

    /// Uses `positions` as the starting layout; their shape is checked immediately.
    pub fn with_initial_positions(mut self, positions: InitialPositions) -> Result<Self> {
        positions.layouts(self.config.population_size, self.config.station_count)?;
        self.initial_positions = Some(positions);
        Ok(self)
    }

    /// Generates the starting layouts once and attaches them, so every variant initialized from
    /// this context starts from the same population. Leaves loaded positions untouched.
    pub fn freeze_initial_positions(mut self) -> Self {
        if self.initial_positions.is_none() {
            let mut rng = seeded_rng(self.config.seed);
            let layouts = self.generate_layouts(&mut rng);
            self.initial_positions = Some(InitialPositions::from_layouts(layouts.iter().map(Vec::as_slice)));
        }
        self
    }

    pub fn area(&self) -> Area { self.config.area() }

    fn generate_layouts(&self, rng: &mut StdRng) -> Vec<Vec<Vec2>> {
        let gen = LayoutGenerator {
            area: self.area(),
            station_count: self.config.station_count,
            station_radius: self.config.station_radius,
            obstacles: &self.obstacles,
        };
        (0..self.config.population_size).map(|_| gen.generate(self.config.init_strategy, rng)).collect()
    }

    fn evaluator(&self) -> CoverageEvaluator {
        CoverageEvaluator::new(self.area(), self.config.station_radius)
            .with_penalty(ProximityPenalty { weight: self.config.fitness_penalty, range_factor: self.config.avoidance.range })
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Copy of the best solution ever observed.
#[derive(Debug, Clone, PartialEq)]
pub struct BestSolution {
    pub positions: Vec<Vec2>,
    pub fitness: f64,
}

pub trait Optimizer: Send {
    fn kind(&self) -> OptimizerKind;
    /// Executes one full iteration and updates the global best.
    fn run_iteration(&mut self);
    fn best_solution(&self) -> Vec<Vec2>;
    /// Global best fitness as a percentage in `[0, 100]`.
    fn best_coverage(&self) -> f64;
    /// Number of completed iterations.
    fn iteration(&self) -> usize;
    fn population(&self) -> &Population;
    fn initial_positions(&self) -> &InitialPositions;

    fn name(&self) -> &'static str { self.kind().label() }
}

/// Builds and initializes an independent optimizer of the requested kind.
pub fn initialize(context: &RunContext, kind: OptimizerKind) -> Result<Box<dyn Optimizer>> {
    let core = EngineCore::new(context, kind)?;
    Ok(match kind {
        OptimizerKind::Pso => Box::new(SwarmOptimizer::new(core, UpdatePolicy::Pso, false)),
        OptimizerKind::PsoGa => Box::new(SwarmOptimizer::new(core, UpdatePolicy::Pso, true)),
        OptimizerKind::Ecppso => Box::new(SwarmOptimizer::new(core, UpdatePolicy::Ecppso, false)),
        OptimizerKind::EcppsoGa => Box::new(SwarmOptimizer::new(core, UpdatePolicy::Ecppso, true)),
        OptimizerKind::Ga => Box::new(GeneticOptimizer { core }),
    })
}

/// State shared by all variants: population, global best, evaluator and RNG.
struct EngineCore {
    kind: OptimizerKind,
    config: OptimizerConfig,
    area: Area,
    obstacles: ObstacleField,
    evaluator: CoverageEvaluator,
    genetic: GeneticOperator,
    population: Population,
    g_best: BestSolution,
    initial: InitialPositions,
    /// 1-based index of the next iteration to run.
    iteration: usize,
    rng: StdRng,
}

impl EngineCore {
    fn new(context: &RunContext, kind: OptimizerKind) -> Result<Self> {
        let config = context.config.clone();
        config.validate()?;
        let area = config.area();
        let mut rng = seeded_rng(config.seed);

        let layouts = match &context.initial_positions {
            Some(loaded) => loaded.layouts(config.population_size, config.station_count)?,
            None => context.generate_layouts(&mut rng),
        };
        let initial = InitialPositions::from_layouts(layouts.iter().map(Vec::as_slice));

        let evaluator = context.evaluator();
        let mut population = Population::new(layouts.into_iter().map(Particle::new).collect());
        evaluator.evaluate_population(&mut population, &context.obstacles, config.parallel_evaluation);
        let g_best = population
            .best()
            .map(|p| BestSolution { positions: p.pos.clone(), fitness: p.fitness })
            .unwrap_or(BestSolution { positions: Vec::new(), fitness: 0.0 });

        info!(
            optimizer = kind.label(),
            population = config.population_size,
            stations = config.station_count,
            obstacles = context.obstacles.len(),
            coverage = g_best.fitness * 100.0,
            "optimizer initialized"
        );

        Ok(Self {
            kind,
            genetic: GeneticOperator::new(&config),
            config,
            area,
            obstacles: context.obstacles.clone(),
            evaluator,
            population,
            g_best,
            initial,
            iteration: 1,
            rng,
        })
    }

    fn evaluate_all(&mut self) {
        self.evaluator.evaluate_population(&mut self.population, &self.obstacles, self.config.parallel_evaluation);
    }

    /// Replaces the global best only on strict improvement.
    fn update_global_best(&mut self) {
        if let Some(candidate) = self.population.best() {
            if candidate.fitness > self.g_best.fitness {
                self.g_best = BestSolution { positions: candidate.pos.clone(), fitness: candidate.fitness };
            }
        }
        debug!(optimizer = self.kind.label(), iteration = self.iteration, coverage = self.best_coverage(), "iteration complete");
        self.iteration += 1;
    }

    fn best_coverage(&self) -> f64 { (self.g_best.fitness * 100.0).clamp(0.0, 100.0) }
}

/// PSO or ECPPSO, optionally followed by GA hybridization each iteration.
pub struct SwarmOptimizer {
    core: EngineCore,
    engine: SwarmEngine,
    use_ga: bool,
}

impl SwarmOptimizer {
    fn new(core: EngineCore, policy: UpdatePolicy, use_ga: bool) -> Self {
        let engine = SwarmEngine::new(&core.config, policy);
        Self { core, engine, use_ga }
    }
}

impl Optimizer for SwarmOptimizer {
    fn kind(&self) -> OptimizerKind { self.core.kind }

    fn run_iteration(&mut self) {
        let core = &mut self.core;
        let g_best = core.g_best.positions.clone();
        self.engine.step(&mut core.population, &g_best, core.iteration, &core.area, &core.obstacles, &mut core.rng);
        core.evaluate_all();
        if self.use_ga {
            core.genetic.hybridize(&mut core.population, &core.evaluator, &core.obstacles, &mut core.rng);
        }
        core.update_global_best();
    }

    fn best_solution(&self) -> Vec<Vec2> { self.core.g_best.positions.clone() }

    fn best_coverage(&self) -> f64 { self.core.best_coverage() }

    fn iteration(&self) -> usize { self.core.iteration - 1 }

    fn population(&self) -> &Population { &self.core.population }

    fn initial_positions(&self) -> &InitialPositions { &self.core.initial }
}

/// GA on its own: every iteration is select, crossover, mutate, evaluate, replace.
pub struct GeneticOptimizer {
    core: EngineCore,
}

impl Optimizer for GeneticOptimizer {
    fn kind(&self) -> OptimizerKind { self.core.kind }

    fn run_iteration(&mut self) {
        let core = &mut self.core;
        core.genetic.next_generation(&mut core.population, &core.evaluator, &core.obstacles, &mut core.rng);
        core.update_global_best();
    }

    fn best_solution(&self) -> Vec<Vec2> { self.core.g_best.positions.clone() }

    fn best_coverage(&self) -> f64 { self.core.best_coverage() }

    fn iteration(&self) -> usize { self.core.iteration - 1 }

    fn population(&self) -> &Population { &self.core.population }

    fn initial_positions(&self) -> &InitialPositions { &self.core.initial }
}
