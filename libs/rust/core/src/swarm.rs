//! Swarm update engine: velocity/position recurrences for plain PSO and ECPPSO.
//!
//! ECPPSO splits the ranked population into a capable group, driven by Neighbor Evolution
//! Prediction (NEP), and a weak bottom group, driven by Strengthening Evolution (SE). Both
//! policies read neighbor fitness and prediction vectors from a snapshot taken once per
//! iteration after ranking, so the outcome does not depend on the order particles are moved in.

use crate::config::{AvoidanceParams, OptimizerConfig};
use crate::geometry::{Area, Vec2};
use crate::obstacle::ObstacleField;
use crate::particle::{weak_group_size, Particle, Population};
use rand::Rng;

/// Gap kept between an ejected station and the obstacle boundary, on top of the station radius.
pub const EJECTION_MARGIN: f64 = 0.1;
/// Velocity factor applied after an obstacle ejection.
pub const EJECTION_DAMPING: f64 = 0.5;
/// Stations within this multiple of an obstacle's radius weaken the SE factor.
const SE_NEAR_FACTOR: f64 = 2.0;
/// Problem dimensionality used by the SE factor `Fd = 1 + d/3`.
const SE_DIMENSION: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Inertia + cognitive (pBest) + social (gBest).
    Pso,
    /// NEP for the capable group, SE for the weak group.
    Ecppso,
}

#[derive(Debug, Clone)]
pub struct SwarmEngine {
    policy: UpdatePolicy,
    w: f64,
    c1: f64,
    c2: f64,
    vmax: f64,
    station_radius: f64,
    max_iterations: usize,
    neighbor_count: usize,
    g_percent: u32,
    use_nep: bool,
    use_se: bool,
    epsilon: f64,
    avoidance: AvoidanceParams,
}

/// Iteration-start view of the ranked population used by NEP.
struct Snapshot {
    fitness: Vec<f64>,
    u: Vec<Vec<Vec2>>,
}

impl SwarmEngine {
    pub fn new(config: &OptimizerConfig, policy: UpdatePolicy) -> Self {
        Self {
            policy,
            w: config.w,
            c1: config.c1,
            c2: config.c2,
            vmax: config.vmax(),
            station_radius: config.station_radius,
            max_iterations: config.max_iterations.max(1),
            neighbor_count: config.neighbor_count,
            g_percent: config.g_percent,
            use_nep: config.use_nep,
            use_se: config.use_se,
            epsilon: config.epsilon,
            avoidance: config.avoidance,
        }
    }

    /// Moves every particle one step. Fitness is not re-evaluated here; the caller does that
    /// once the whole population has moved. `g_best` is the global best as of the start of
    /// the iteration and `iteration` is 1-based.
    pub fn step<R: Rng + ?Sized>(
        &self,
        population: &mut Population,
        g_best: &[Vec2],
        iteration: usize,
        area: &Area,
        obstacles: &ObstacleField,
        rng: &mut R,
    ) {
        match self.policy {
            UpdatePolicy::Pso => {
                for p in population.particles_mut() {
                    self.pso_velocity(p, g_best, rng);
                    self.advance(p, area, obstacles, rng);
                }
            }
            UpdatePolicy::Ecppso => self.ecppso_step(population, g_best, iteration, area, obstacles, rng),
        }
    }

    fn ecppso_step<R: Rng + ?Sized>(
        &self,
        population: &mut Population,
        g_best: &[Vec2],
        iteration: usize,
        area: &Area,
        obstacles: &ObstacleField,
        rng: &mut R,
    ) {
        for p in population.particles_mut() { p.update_prediction(); }
        population.rank();

        let snapshot = Snapshot {
            fitness: population.iter().map(|p| p.fitness).collect(),
            u: population.iter().map(|p| p.u.clone()).collect(),
        };
        let size = population.len();
        let weak_from = size - weak_group_size(size, self.g_percent);

        for (idx, p) in population.particles_mut().iter_mut().enumerate() {
            match (idx >= weak_from, self.use_se, self.use_nep) {
                (true, true, _) => self.se_velocity(p, g_best, iteration, obstacles, rng),
                (false, _, true) => self.nep_velocity(p, idx, &snapshot, g_best, iteration, obstacles, rng),
                _ => self.pso_velocity(p, g_best, rng),
            }
            self.advance(p, area, obstacles, rng);
        }
    }

    fn pso_velocity<R: Rng + ?Sized>(&self, p: &mut Particle, g_best: &[Vec2], rng: &mut R) {
        for i in 0..p.station_count() {
            let (r1, r2): (f64, f64) = (rng.gen(), rng.gen());
            p.vel[i] = self.w * p.vel[i]
                + self.c1 * r1 * (p.p_best[i] - p.pos[i])
                + self.c2 * r2 * (g_best[i] - p.pos[i]);
        }
    }

    /// Indices of the `neighbor_count` other particles with the closest fitness; ties go to
    /// the better-ranked particle.
    fn neighbors(&self, idx: usize, snapshot: &Snapshot) -> Vec<usize> {
        let own = snapshot.fitness[idx];
        let mut others: Vec<usize> = (0..snapshot.fitness.len()).filter(|&j| j != idx).collect();
        others.sort_by(|&a, &b| {
            (snapshot.fitness[a] - own).abs().total_cmp(&(snapshot.fitness[b] - own).abs()).then(a.cmp(&b))
        });
        others.truncate(self.neighbor_count);
        others
    }

    #[allow(clippy::too_many_arguments)]
    fn nep_velocity<R: Rng + ?Sized>(
        &self,
        p: &mut Particle,
        idx: usize,
        snapshot: &Snapshot,
        g_best: &[Vec2],
        iteration: usize,
        obstacles: &ObstacleField,
        rng: &mut R,
    ) {
        let neighbors = self.neighbors(idx, snapshot);
        let divisor = (neighbors.len() + 1) as f64;
        let step_scale = iteration.max(1) as f64;
        for i in 0..p.station_count() {
            let sum = snapshot.u[idx][i] + neighbors.iter().map(|&j| snapshot.u[j][i]).sum::<Vec2>();
            let avg_u = sum / divisor;
            let (r1, r2): (f64, f64) = (rng.gen(), rng.gen());
            p.vel[i] = self.w * p.vel[i]
                + self.c1 * r1 * (g_best[i] - p.pos[i])
                + self.c2 * r2 * (avg_u / step_scale)
                + self.repulsion(p.pos[i], obstacles);
        }
    }

    fn se_velocity<R: Rng + ?Sized>(
        &self,
        p: &mut Particle,
        g_best: &[Vec2],
        iteration: usize,
        obstacles: &ObstacleField,
        rng: &mut R,
    ) {
        let mut fd = 1.0 + SE_DIMENSION / 3.0;
        if !obstacles.is_empty() {
            fd -= self.epsilon * obstacles.count_near(&p.pos, SE_NEAR_FACTOR) as f64;
        }
        let progress = iteration as f64 / self.max_iterations as f64;
        for i in 0..p.station_count() {
            let (r1, r2): (f64, f64) = (rng.gen(), rng.gen());
            p.vel[i] = self.w * p.vel[i]
                + self.c1 * r1 * (g_best[i] - p.pos[i])
                + self.c2 * r2 * p.u[i] * (progress * fd)
                + self.repulsion(p.pos[i], obstacles);
        }
    }

    fn repulsion(&self, pos: Vec2, obstacles: &ObstacleField) -> Vec2 {
        if obstacles.is_empty() { return Vec2::ZERO; }
        obstacles.repulsion(pos, self.avoidance.strength, self.avoidance.range)
    }

    /// Clamp, move, bounce off the area boundary, then eject from obstacles.
    fn advance<R: Rng + ?Sized>(&self, p: &mut Particle, area: &Area, obstacles: &ObstacleField, rng: &mut R) {
        for i in 0..p.station_count() {
            let v = p.vel[i].clamp_magnitude(self.vmax);
            let (mut pos, mut v) = area.bounce(p.pos[i] + v, v);
            if let Some(out) = obstacles.eject(pos, self.station_radius + EJECTION_MARGIN, rng) {
                pos = area.clamp(out);
                v *= EJECTION_DAMPING;
            }
            p.vel[i] = v;
            p.pos[i] = pos;
        }
    }
}
