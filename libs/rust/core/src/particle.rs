//! Candidate solutions and the ranked population that holds them.

use crate::geometry::Vec2;

/// `p_best_fitness` value of a particle that has never been evaluated.
pub const UNSET_FITNESS: f64 = -1.0;

/// One candidate placement of all N stations.
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec<Vec2>,
    pub vel: Vec<Vec2>,
    pub p_best: Vec<Vec2>,
    pub p_best_fitness: f64,
    pub fitness: f64,
    /// Prediction vectors (ECPPSO): smoothed drift toward `p_best`.
    pub u: Vec<Vec2>,
}

impl Particle {
    /// Fresh particle at `pos` with zeroed dynamics and an unset personal best.
    pub fn new(pos: Vec<Vec2>) -> Self {
        let n = pos.len();
        Self {
            p_best: pos.clone(),
            pos,
            vel: vec![Vec2::ZERO; n],
            p_best_fitness: UNSET_FITNESS,
            fitness: 0.0,
            u: vec![Vec2::ZERO; n],
        }
    }

    pub fn station_count(&self) -> usize { self.pos.len() }

    /// Stores a fresh evaluation and promotes the current position to personal best on strict
    /// improvement.
    pub fn record_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
        if fitness > self.p_best_fitness {
            self.p_best_fitness = fitness;
            self.p_best.clone_from(&self.pos);
        }
    }

    /// `u[i] = 0.5 * u[i] + (p_best[i] - pos[i])`
    pub fn update_prediction(&mut self) {
        for ((u, best), pos) in self.u.iter_mut().zip(&self.p_best).zip(&self.pos) {
            *u = *u * 0.5 + (*best - *pos);
        }
    }

    pub fn is_consistent(&self) -> bool {
        let n = self.pos.len();
        self.vel.len() == n && self.u.len() == n && self.p_best.len() == n
    }
}

/// Ordered particle collection; rank order is only meaningful right after [`Population::rank`].
#[derive(Debug, Clone, Default)]
pub struct Population {
    particles: Vec<Particle>,
}

impl Population {
    pub fn new(particles: Vec<Particle>) -> Self { Self { particles } }

    pub fn len(&self) -> usize { self.particles.len() }

    pub fn is_empty(&self) -> bool { self.particles.is_empty() }

    pub fn particles(&self) -> &[Particle] { &self.particles }

    pub fn particles_mut(&mut self) -> &mut [Particle] { &mut self.particles }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> { self.particles.iter() }

    /// Sorts best-first by current fitness. Stable, so equal fitness keeps prior order.
    pub fn rank(&mut self) {
        self.particles.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    }

    /// Highest-fitness particle regardless of current order.
    pub fn best(&self) -> Option<&Particle> {
        self.particles.iter().reduce(|best, p| if p.fitness > best.fitness { p } else { best })
    }

    /// Puts `particle` at rank slot `len - 1 - offset` (offset 0 = worst).
    pub fn replace_from_bottom(&mut self, offset: usize, particle: Particle) -> bool {
        match self.particles.len().checked_sub(1 + offset) {
            Some(idx) => { self.particles[idx] = particle; true }
            None => false,
        }
    }
}

/// Size of the weak (bottom) group for a `g_percent` share: `max(1, P * G / 100)`, capped at P.
pub fn weak_group_size(population: usize, g_percent: u32) -> usize {
    (population * g_percent as usize / 100).max(1).min(population)
}
