//! Grid-sampled coverage fitness.
//!
//! The area is split into `L x W` unit cells sampled at their centers. Each station only scans
//! the cells inside its own clipped bounding box, and cells already marked are skipped, so one
//! evaluation costs roughly `N * (2R + 1)^2` distance checks instead of `N * L * W`.

use crate::geometry::{Area, Vec2};
use crate::obstacle::ObstacleField;
use crate::particle::{Particle, Population};
use rayon::prelude::*;

/// Optional proximity penalty applied on top of raw coverage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityPenalty {
    pub weight: f64,
    pub range_factor: f64,
}

#[derive(Debug, Clone)]
pub struct CoverageEvaluator {
    area: Area,
    radius: f64,
    penalty: Option<ProximityPenalty>,
}

impl CoverageEvaluator {
    pub fn new(area: Area, radius: f64) -> Self { Self { area, radius, penalty: None } }

    pub fn with_penalty(mut self, penalty: ProximityPenalty) -> Self {
        self.penalty = (penalty.weight > 0.0).then_some(penalty);
        self
    }

    pub fn area(&self) -> Area { self.area }

    pub fn radius(&self) -> f64 { self.radius }

    /// Number of unit cells whose center lies within `radius` of at least one station.
    pub fn covered_cells(&self, stations: &[Vec2]) -> usize {
        let (len, wid) = (self.area.length as i64, self.area.width as i64);
        let total = self.area.cell_count();
        if total == 0 { return 0; }
        let mut marked = vec![false; total];
        let mut covered = 0usize;
        let (offset_x, offset_y) = (-self.area.half_length(), -self.area.half_width());
        let r = self.radius;
        let r2 = r * r;

        for s in stations {
            if !s.is_finite() { continue; }
            let x_min = ((s.x - r - offset_x).floor() as i64).max(0);
            let x_max = ((s.x + r - offset_x).ceil() as i64).min(len - 1);
            let y_min = ((s.y - r - offset_y).floor() as i64).max(0);
            let y_max = ((s.y + r - offset_y).ceil() as i64).min(wid - 1);
            if x_min > x_max || y_min > y_max { continue; }

            for y in y_min..=y_max {
                let row = (y * len) as usize;
                let cy = offset_y + y as f64 + 0.5;
                let dy2 = (s.y - cy) * (s.y - cy);
                if dy2 > r2 { continue; }
                for x in x_min..=x_max {
                    let idx = row + x as usize;
                    if marked[idx] { continue; }
                    let cx = offset_x + x as f64 + 0.5;
                    if (s.x - cx) * (s.x - cx) + dy2 <= r2 {
                        marked[idx] = true;
                        covered += 1;
                    }
                }
            }
        }
        covered
    }

    /// Coverage fraction in `[0, 1]`, less the proximity penalty when one is configured.
    pub fn coverage(&self, stations: &[Vec2], obstacles: &ObstacleField) -> f64 {
        let total = self.area.cell_count();
        if total == 0 { return 0.0; }
        let mut fitness = self.covered_cells(stations) as f64 / total as f64;
        if let Some(p) = self.penalty {
            fitness -= obstacles.proximity_penalty(stations, p.weight, p.range_factor);
        }
        fitness.clamp(0.0, 1.0)
    }

    /// Scores the particle's current positions and applies the personal-best rule.
    pub fn evaluate(&self, particle: &mut Particle, obstacles: &ObstacleField) -> f64 {
        let fitness = self.coverage(&particle.pos, obstacles);
        particle.record_fitness(fitness);
        fitness
    }

    /// Evaluates every particle; each evaluation only reads its own positions, so the
    /// parallel path gives identical results.
    pub fn evaluate_population(&self, population: &mut Population, obstacles: &ObstacleField, parallel: bool) {
        if parallel {
            population.particles_mut().par_iter_mut().for_each(|p| { self.evaluate(p, obstacles); });
        } else {
            for p in population.particles_mut() { self.evaluate(p, obstacles); }
        }
    }
}
