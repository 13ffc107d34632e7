//! Initial station layouts for a fresh population.
//!
//! Every strategy rejects samples that fall inside an obstacle, but only for a bounded number
//! of attempts; after that the last sample is accepted so initialization always terminates.

use crate::config::InitStrategy;
use crate::geometry::{Area, Vec2};
use crate::obstacle::ObstacleField;
use rand::Rng;
use tracing::debug;

pub const MAX_PLACEMENT_ATTEMPTS: usize = 100;
const MAX_CLUSTER_ATTEMPTS: usize = 50;

/// Uniform point in `area` outside every obstacle, or the last sample once attempts run out.
pub fn sample_free_position<R: Rng + ?Sized>(rng: &mut R, area: &Area, obstacles: &ObstacleField) -> Vec2 {
    let mut pos = area.sample(rng);
    if obstacles.is_empty() { return pos; }
    for _ in 1..MAX_PLACEMENT_ATTEMPTS {
        if !obstacles.contains(pos) { return pos; }
        pos = area.sample(rng);
    }
    if obstacles.contains(pos) {
        debug!(?pos, attempts = MAX_PLACEMENT_ATTEMPTS, "no free position found, accepting last sample");
    }
    pos
}

pub struct LayoutGenerator<'a> {
    pub area: Area,
    pub station_count: usize,
    pub station_radius: f64,
    pub obstacles: &'a ObstacleField,
}

impl LayoutGenerator<'_> {
    pub fn generate<R: Rng + ?Sized>(&self, strategy: InitStrategy, rng: &mut R) -> Vec<Vec2> {
        match strategy {
            InitStrategy::Uniform => self.uniform(rng),
            InitStrategy::Clustered { cluster_count } => self.clustered(cluster_count, rng),
            InitStrategy::MinDistance { min_distance } => self.min_distance(min_distance, rng),
        }
    }

    fn uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Vec2> {
        (0..self.station_count).map(|_| sample_free_position(rng, &self.area, self.obstacles)).collect()
    }

    /// Stations spread within `2R` of a few random cluster centers.
    fn clustered<R: Rng + ?Sized>(&self, cluster_count: usize, rng: &mut R) -> Vec<Vec2> {
        let clusters = cluster_count.clamp(1, self.station_count.max(1));
        let centers: Vec<Vec2> = (0..clusters).map(|_| sample_free_position(rng, &self.area, self.obstacles)).collect();
        let per_cluster = self.station_count / clusters;
        let remainder = self.station_count % clusters;
        let spread = self.station_radius * 2.0;

        let mut out = Vec::with_capacity(self.station_count);
        for (c, center) in centers.iter().enumerate() {
            let members = per_cluster + usize::from(c < remainder);
            for _ in 0..members {
                let mut pos = self.around(*center, spread, rng);
                let mut attempts = 0;
                while self.obstacles.contains(pos) && attempts < MAX_CLUSTER_ATTEMPTS {
                    pos = self.around(*center, spread, rng);
                    attempts += 1;
                }
                out.push(pos);
            }
        }
        out
    }

    fn around<R: Rng + ?Sized>(&self, center: Vec2, spread: f64, rng: &mut R) -> Vec2 {
        let dist = if spread > 0.0 { rng.gen_range(0.0..spread) } else { 0.0 };
        self.area.clamp(center + Vec2::random_unit(rng) * dist)
    }

    /// Rejects samples closer than `min_distance` to already placed stations.
    fn min_distance<R: Rng + ?Sized>(&self, min_distance: f64, rng: &mut R) -> Vec<Vec2> {
        let mut out: Vec<Vec2> = Vec::with_capacity(self.station_count);
        for _ in 0..self.station_count {
            let mut pos = sample_free_position(rng, &self.area, self.obstacles);
            let mut attempts = 1;
            while attempts < MAX_PLACEMENT_ATTEMPTS && out.iter().any(|p| p.distance(pos) < min_distance) {
                pos = sample_free_position(rng, &self.area, self.obstacles);
                attempts += 1;
            }
            out.push(pos);
        }
        out
    }
}
