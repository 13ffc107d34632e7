//! Genetic operators: uniform crossover, bounded mutation and two replacement schemes.
//!
//! * [`GeneticOperator::hybridize`] runs after a swarm step and replaces the weakest `G%` of
//!   the population with children bred from the elite pool's personal bests.
//! * [`GeneticOperator::next_generation`] is the GA-only scheme: elites carry over and the rest
//!   of the population is rebuilt from tournament-selected parents.

use crate::config::OptimizerConfig;
use crate::fitness::CoverageEvaluator;
use crate::geometry::{Area, Vec2};
use crate::obstacle::ObstacleField;
use crate::particle::{weak_group_size, Particle, Population};
use crate::swarm::EJECTION_MARGIN;
use rand::Rng;
use tracing::trace;

pub const TOURNAMENT_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct GeneticOperator {
    area: Area,
    elite_percent: f64,
    g_percent: u32,
    mutation_rate: f64,
    mutation_step: f64,
    clearance: f64,
}

impl GeneticOperator {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            area: config.area(),
            elite_percent: config.elite_percent,
            g_percent: config.g_percent,
            mutation_rate: config.mutation_rate,
            mutation_step: config.mutation_step,
            clearance: config.station_radius + EJECTION_MARGIN,
        }
    }

    fn elite_share(&self, size: usize) -> usize { (size as f64 * self.elite_percent / 100.0).ceil() as usize }

    /// Breeding pool size for hybridization: `max(2, ceil(P * E%))`, capped at P.
    pub fn parent_pool_size(&self, size: usize) -> usize { self.elite_share(size).max(2).min(size) }

    /// Elites carried unchanged into the next GA-only generation; always leaves room for a child.
    pub fn carry_over_count(&self, size: usize) -> usize { self.elite_share(size).max(1).min(size.saturating_sub(1)) }

    /// Children produced per hybridization call (mirrors the SE weak-group size).
    pub fn replace_count(&self, size: usize) -> usize { weak_group_size(size, self.g_percent) }

    /// Each station copied from `a` or `b` with equal probability.
    pub fn crossover_uniform<R: Rng + ?Sized>(a: &[Vec2], b: &[Vec2], rng: &mut R) -> Vec<Vec2> {
        a.iter().zip(b).map(|(x, y)| if rng.gen_bool(0.5) { *x } else { *y }).collect()
    }

    /// Per-station random displacement in `[-step, step]^2` with probability `mutation_rate`,
    /// kept inside the area and out of obstacles.
    pub fn mutate<R: Rng + ?Sized>(&self, pos: &mut [Vec2], obstacles: &ObstacleField, rng: &mut R) {
        let step = self.mutation_step;
        for station in pos.iter_mut() {
            if rng.gen::<f64>() >= self.mutation_rate { continue; }
            let delta = if step > 0.0 {
                Vec2::new(rng.gen_range(-step..=step), rng.gen_range(-step..=step))
            } else {
                Vec2::ZERO
            };
            let mut moved = self.area.clamp(*station + delta);
            if let Some(out) = obstacles.eject(moved, self.clearance, rng) {
                moved = self.area.clamp(out);
            }
            *station = moved;
        }
    }

    /// Child particle at `pos`: zero dynamics, personal best reset, freshly evaluated.
    fn offspring(&self, pos: Vec<Vec2>, evaluator: &CoverageEvaluator, obstacles: &ObstacleField) -> Particle {
        let mut child = Particle::new(pos);
        evaluator.evaluate(&mut child, obstacles);
        child
    }

    fn breed<R: Rng + ?Sized>(&self, a: &[Vec2], b: &[Vec2], evaluator: &CoverageEvaluator, obstacles: &ObstacleField, rng: &mut R) -> Particle {
        let mut pos = Self::crossover_uniform(a, b, rng);
        self.mutate(&mut pos, obstacles, rng);
        self.offspring(pos, evaluator, obstacles)
    }

    /// Replaces the bottom `G%` with children of the elite pool (crossover of parents' personal
    /// bests), filling from the worst slot upward, then re-ranks. Returns the number replaced.
    pub fn hybridize<R: Rng + ?Sized>(
        &self,
        population: &mut Population,
        evaluator: &CoverageEvaluator,
        obstacles: &ObstacleField,
        rng: &mut R,
    ) -> usize {
        if population.is_empty() { return 0; }
        population.rank();
        let size = population.len();
        let pool: Vec<Vec<Vec2>> = population.iter().take(self.parent_pool_size(size)).map(|p| p.p_best.clone()).collect();
        let children = self.replace_count(size);

        for i in 0..children {
            let a = &pool[rng.gen_range(0..pool.len())];
            let b = &pool[rng.gen_range(0..pool.len())];
            let child = self.breed(a, b, evaluator, obstacles, rng);
            trace!(slot = size - 1 - i, fitness = child.fitness, "child inserted");
            population.replace_from_bottom(i, child);
        }
        population.rank();
        children
    }

    /// GA-only generation: copy the elites, fill the remainder with tournament-bred children.
    pub fn next_generation<R: Rng + ?Sized>(
        &self,
        population: &mut Population,
        evaluator: &CoverageEvaluator,
        obstacles: &ObstacleField,
        rng: &mut R,
    ) {
        if population.is_empty() { return; }
        population.rank();
        let size = population.len();
        let previous = population.particles();

        let mut next: Vec<Particle> = previous
            .iter()
            .take(self.carry_over_count(size))
            .map(|elite| self.offspring(elite.pos.clone(), evaluator, obstacles))
            .collect();
        while next.len() < size {
            let a = tournament(previous, TOURNAMENT_SIZE, rng);
            let b = tournament(previous, TOURNAMENT_SIZE, rng);
            next.push(self.breed(&a.pos, &b.pos, evaluator, obstacles, rng));
        }

        *population = Population::new(next);
        population.rank();
    }
}

/// Fittest of `k` uniform draws (with replacement).
pub fn tournament<'a, R: Rng + ?Sized>(pool: &'a [Particle], k: usize, rng: &mut R) -> &'a Particle {
    let mut best = &pool[rng.gen_range(0..pool.len())];
    for _ in 1..k.max(1) {
        let cand = &pool[rng.gen_range(0..pool.len())];
        if cand.fitness > best.fitness { best = cand; }
    }
    best
}
