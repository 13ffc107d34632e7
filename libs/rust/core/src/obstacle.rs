//! Obstacle geometry: circles and convex polygons as pure predicates.
//!
//! Obstacles are built once from their serialized [`ObstacleSpec`] and never mutated. Derived
//! quantities (center, effective radius, degeneracy) are computed at construction so the
//! per-station queries issued by the swarm engine stay cheap.

use crate::geometry::{Area, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Distance below which a point is treated as sitting on the obstacle center.
const CENTER_EPSILON: f64 = 0.01;
const DEGENERATE_AREA: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObstacleSpec {
    Circle { center: Vec2, radius: f64 },
    Polygon { vertices: Vec<Vec2> },
}

#[derive(Debug, Clone)]
enum Shape {
    Circle { radius: f64 },
    Polygon { vertices: Vec<Vec2> },
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    shape: Shape,
    center: Vec2,
    effective_radius: f64,
    degenerate: bool,
}

impl Obstacle {
    pub fn circle(center: Vec2, radius: f64) -> Self {
        let radius = radius.max(0.0);
        Self { shape: Shape::Circle { radius }, center, effective_radius: radius, degenerate: radius <= 0.0 }
    }

    pub fn polygon(vertices: Vec<Vec2>) -> Self {
        let center = if vertices.is_empty() {
            Vec2::ZERO
        } else {
            vertices.iter().copied().sum::<Vec2>() / vertices.len() as f64
        };
        let effective_radius = vertices.iter().map(|v| v.distance(center)).fold(0.0, f64::max);
        let degenerate = vertices.len() < 3 || signed_area(&vertices).abs() < DEGENERATE_AREA;
        Self { shape: Shape::Polygon { vertices }, center, effective_radius, degenerate }
    }

    pub fn center(&self) -> Vec2 { self.center }

    /// Radius of the circle, or the largest centroid-to-vertex distance of a polygon.
    pub fn effective_radius(&self) -> f64 { self.effective_radius }

    pub fn is_degenerate(&self) -> bool { self.degenerate }

    pub fn contains(&self, p: Vec2) -> bool {
        if self.degenerate { return false; }
        match &self.shape {
            Shape::Circle { radius } => p.distance_squared(self.center) <= radius * radius,
            Shape::Polygon { vertices } => {
                // Half-plane test; accepts either winding.
                let (mut pos, mut neg) = (false, false);
                for (a, b) in edges(vertices) {
                    let side = (b - a).cross(p - a);
                    if side > 1e-12 { pos = true; }
                    if side < -1e-12 { neg = true; }
                    if pos && neg { return false; }
                }
                true
            }
        }
    }

    /// Outward unit normal of the boundary feature nearest to `p` and the distance to it.
    pub fn nearest_boundary_outward_normal(&self, p: Vec2) -> Option<(Vec2, f64)> {
        if self.degenerate { return None; }
        match &self.shape {
            Shape::Circle { radius } => {
                let offset = p - self.center;
                let dir = offset.normalized()?;
                Some((dir, (offset.length() - radius).abs()))
            }
            Shape::Polygon { vertices } => {
                let mut best: Option<(Vec2, f64)> = None;
                for (a, b) in edges(vertices) {
                    let edge = b - a;
                    let len_sq = edge.length_squared();
                    if len_sq < 1e-12 { continue; }
                    let t = ((p - a).dot(edge) / len_sq).clamp(0.0, 1.0);
                    let dist = p.distance(a + edge * t);
                    if best.map_or(true, |(_, d)| dist < d) {
                        let mut normal = edge.perp() / len_sq.sqrt();
                        let mid = (a + b) * 0.5;
                        if normal.dot(mid - self.center) < 0.0 { normal = -normal; }
                        best = Some((normal, dist));
                    }
                }
                best
            }
        }
    }

    /// Distance from the center to the boundary along unit direction `dir`.
    pub fn boundary_distance_along(&self, dir: Vec2) -> f64 {
        match &self.shape {
            Shape::Circle { radius } => *radius,
            Shape::Polygon { vertices } => {
                let mut nearest = f64::INFINITY;
                for (a, b) in edges(vertices) {
                    let edge = b - a;
                    let denom = dir.cross(edge);
                    if denom.abs() < 1e-12 { continue; }
                    let to_a = a - self.center;
                    let t = to_a.cross(edge) / denom;
                    let s = to_a.cross(dir) / denom;
                    if t >= 0.0 && (-1e-9..=1.0 + 1e-9).contains(&s) { nearest = nearest.min(t); }
                }
                if nearest.is_finite() { nearest } else { self.effective_radius }
            }
        }
    }

    /// Push away from the center; zero outside `range` or at the center itself.
    pub fn repulsive_force(&self, p: Vec2, strength: f64, range: f64) -> Vec2 {
        let offset = p - self.center;
        let dist = offset.length();
        if dist >= range || dist <= CENTER_EPSILON { return Vec2::ZERO; }
        offset / dist * (strength * (1.0 - dist / range))
    }
}

impl From<ObstacleSpec> for Obstacle {
    fn from(spec: ObstacleSpec) -> Self {
        match spec {
            ObstacleSpec::Circle { center, radius } => Obstacle::circle(center, radius),
            ObstacleSpec::Polygon { vertices } => Obstacle::polygon(vertices),
        }
    }
}

fn edges(vertices: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    (0..vertices.len()).map(move |i| (vertices[i], vertices[(i + 1) % vertices.len()]))
}

fn signed_area(vertices: &[Vec2]) -> f64 {
    edges(vertices).map(|(a, b)| a.cross(b)).sum::<f64>() * 0.5
}

/// Read-only set of obstacles consulted by the evaluator, the swarm engine and the GA.
#[derive(Debug, Clone, Default)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn new<I>(specs: I) -> Self
    where I: IntoIterator<Item = ObstacleSpec> {
        let obstacles: Vec<Obstacle> = specs.into_iter().map(Obstacle::from).collect();
        for (idx, ob) in obstacles.iter().enumerate() {
            if ob.is_degenerate() {
                warn!(obstacle = idx, center = ?ob.center(), "degenerate obstacle ignored by containment checks");
            }
        }
        Self { obstacles }
    }

    pub fn empty() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.obstacles.is_empty() }

    pub fn len(&self) -> usize { self.obstacles.len() }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> { self.obstacles.iter() }

    pub fn contains(&self, p: Vec2) -> bool { self.obstacles.iter().any(|o| o.contains(p)) }

    /// Sum of repulsive forces; each obstacle acts within `range_factor * effective_radius`.
    pub fn repulsion(&self, p: Vec2, strength: f64, range_factor: f64) -> Vec2 {
        self.obstacles
            .iter()
            .map(|o| o.repulsive_force(p, strength, o.effective_radius() * range_factor))
            .sum()
    }

    /// Number of stations lying within `factor * effective_radius` of any obstacle center.
    pub fn count_near(&self, stations: &[Vec2], factor: f64) -> usize {
        stations
            .iter()
            .filter(|s| self.obstacles.iter().any(|o| s.distance(o.center()) < o.effective_radius() * factor))
            .count()
    }

    /// Proximity penalty used by the optional fitness term.
    pub fn proximity_penalty(&self, stations: &[Vec2], weight: f64, range_factor: f64) -> f64 {
        if weight <= 0.0 { return 0.0; }
        let mut penalty = 0.0;
        for s in stations {
            for o in &self.obstacles {
                let range = o.effective_radius() * range_factor;
                let dist = s.distance(o.center());
                if range > 0.0 && dist < range { penalty += weight * (1.0 - dist / range); }
            }
        }
        penalty
    }

    /// Moves `p` out of every obstacle that contains it, to the boundary along the outward
    /// direction from the center plus `clearance`. Returns `None` if `p` was free.
    pub fn eject<R: Rng + ?Sized>(&self, p: Vec2, clearance: f64, rng: &mut R) -> Option<Vec2> {
        let mut current = p;
        let mut moved = false;
        for o in &self.obstacles {
            if !o.contains(current) { continue; }
            let offset = current - o.center();
            let dir = if offset.length() <= CENTER_EPSILON {
                Vec2::random_unit(rng)
            } else {
                offset.normalized().unwrap_or_else(|| Vec2::random_unit(rng))
            };
            current = o.center() + dir * (o.boundary_distance_along(dir) + clearance);
            moved = true;
        }
        moved.then_some(current)
    }
}

/// Random convex polygon centered uniformly in `area`: evenly spaced angles with jitter and a
/// slightly varying radius so the outline stays simple.
pub fn generate_convex_polygon<R: Rng + ?Sized>(rng: &mut R, area: &Area, vertex_count: usize, max_size: f64) -> ObstacleSpec {
    let vertex_count = vertex_count.max(3);
    let center = area.sample(rng);
    let base_radius = max_size * rng.gen_range(0.7..=0.9);
    let step = std::f64::consts::TAU / vertex_count as f64;
    let wobble = max_size * 0.15;
    let vertices = (0..vertex_count)
        .map(|i| {
            let angle = i as f64 * step + rng.gen_range(-step * 0.2..=step * 0.2);
            let r = base_radius + if wobble > 0.0 { rng.gen_range(-wobble..=wobble) } else { 0.0 };
            center + Vec2::new(angle.cos(), angle.sin()) * r
        })
        .collect();
    ObstacleSpec::Polygon { vertices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn square(half: f64) -> Obstacle {
        Obstacle::polygon(vec![
            Vec2::new(-half, -half), Vec2::new(half, -half), Vec2::new(half, half), Vec2::new(-half, half),
        ])
    }

    #[test]
    fn polygon_containment_either_winding() {
        let ccw = square(2.0);
        let mut rev = vec![Vec2::new(-2.0, -2.0), Vec2::new(2.0, -2.0), Vec2::new(2.0, 2.0), Vec2::new(-2.0, 2.0)];
        rev.reverse();
        let cw = Obstacle::polygon(rev);
        for ob in [&ccw, &cw] {
            assert!(ob.contains(Vec2::new(1.0, -1.5)));
            assert!(!ob.contains(Vec2::new(2.5, 0.0)));
        }
    }

    #[test]
    fn degenerate_polygon_never_contains() {
        let line = Obstacle::polygon(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)]);
        assert!(line.is_degenerate());
        assert!(!line.contains(Vec2::new(1.0, 1.0)));
        let two = Obstacle::polygon(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
        assert!(!two.contains(Vec2::new(0.5, 0.0)));
        assert!(two.nearest_boundary_outward_normal(Vec2::ZERO).is_none());
    }

    #[test]
    fn circle_normal_and_distance() {
        let c = Obstacle::circle(Vec2::new(1.0, 1.0), 2.0);
        let (n, d) = c.nearest_boundary_outward_normal(Vec2::new(1.0, 2.0)).unwrap();
        assert_eq!(n, Vec2::new(0.0, 1.0));
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn polygon_normal_points_outward() {
        let sq = square(2.0);
        let (n, d) = sq.nearest_boundary_outward_normal(Vec2::new(1.5, 0.2)).unwrap();
        assert!((n.x - 1.0).abs() < 1e-12 && n.y.abs() < 1e-12);
        assert!((d - 0.5).abs() < 1e-12);
        let (n, _) = sq.nearest_boundary_outward_normal(Vec2::new(0.1, -3.0)).unwrap();
        assert!((n.y + 1.0).abs() < 1e-12);
    }

    #[test]
    fn repulsion_decays_with_distance() {
        let c = Obstacle::circle(Vec2::ZERO, 1.0);
        assert_eq!(c.repulsive_force(Vec2::new(3.0, 0.0), 1.0, 2.0), Vec2::ZERO);
        let near = c.repulsive_force(Vec2::new(0.5, 0.0), 1.0, 2.0);
        let far = c.repulsive_force(Vec2::new(1.5, 0.0), 1.0, 2.0);
        assert!((near.x - 0.75).abs() < 1e-12);
        assert!((far.x - 0.25).abs() < 1e-12);
        assert_eq!(c.repulsive_force(Vec2::ZERO, 1.0, 2.0), Vec2::ZERO);
    }

    #[test]
    fn eject_moves_point_clear_of_obstacle() {
        let field = ObstacleField::new(vec![
            ObstacleSpec::Polygon { vertices: vec![Vec2::new(-2.0, -2.0), Vec2::new(2.0, -2.0), Vec2::new(2.0, 2.0), Vec2::new(-2.0, 2.0)] },
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let out = field.eject(Vec2::new(1.0, 0.0), 0.5, &mut rng).unwrap();
        assert!((out.x - 2.5).abs() < 1e-9 && out.y.abs() < 1e-9);
        assert!(!field.contains(out));
        let centered = field.eject(Vec2::ZERO, 0.1, &mut rng).unwrap();
        assert!(!field.contains(centered));
        assert!(field.eject(Vec2::new(5.0, 5.0), 0.5, &mut rng).is_none());
    }

    #[test]
    fn generated_polygon_is_convex_and_usable() {
        let mut rng = StdRng::seed_from_u64(11);
        let area = Area::new(50, 50);
        let ob = Obstacle::from(generate_convex_polygon(&mut rng, &area, 6, 5.0));
        assert!(!ob.is_degenerate());
        assert!(ob.contains(ob.center()));
        assert!(ob.effective_radius() > 0.0);
    }
}
