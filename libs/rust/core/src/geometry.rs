//! Planar primitives shared by the engine: a 2-D vector and the deployment area.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }

    pub fn dot(self, other: Vec2) -> f64 { self.x * other.x + self.y * other.y }

    /// z-component of the 3-D cross product.
    pub fn cross(self, other: Vec2) -> f64 { self.x * other.y - self.y * other.x }

    pub fn length_squared(self) -> f64 { self.dot(self) }

    pub fn length(self) -> f64 { self.length_squared().sqrt() }

    pub fn distance(self, other: Vec2) -> f64 { (self - other).length() }

    pub fn distance_squared(self, other: Vec2) -> f64 { (self - other).length_squared() }

    /// Unit vector in the same direction, or `None` for (near) zero vectors.
    pub fn normalized(self) -> Option<Vec2> {
        let len = self.length();
        if len <= f64::EPSILON { None } else { Some(self / len) }
    }

    /// Scales the vector down so its magnitude does not exceed `max`.
    pub fn clamp_magnitude(self, max: f64) -> Vec2 {
        let len_sq = self.length_squared();
        if len_sq > max * max && len_sq > 0.0 { self * (max / len_sq.sqrt()) } else { self }
    }

    /// Counter-clockwise perpendicular.
    pub fn perp(self) -> Vec2 { Vec2::new(-self.y, self.x) }

    /// Uniformly distributed unit vector.
    pub fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        Vec2::new(angle.cos(), angle.sin())
    }

    pub fn is_finite(self) -> bool { self.x.is_finite() && self.y.is_finite() }
}

impl Add for Vec2 { type Output = Vec2; fn add(self, o: Vec2) -> Vec2 { Vec2::new(self.x + o.x, self.y + o.y) } }
impl AddAssign for Vec2 { fn add_assign(&mut self, o: Vec2) { self.x += o.x; self.y += o.y; } }
impl Sub for Vec2 { type Output = Vec2; fn sub(self, o: Vec2) -> Vec2 { Vec2::new(self.x - o.x, self.y - o.y) } }
impl Mul<f64> for Vec2 { type Output = Vec2; fn mul(self, s: f64) -> Vec2 { Vec2::new(self.x * s, self.y * s) } }
impl Mul<Vec2> for f64 { type Output = Vec2; fn mul(self, v: Vec2) -> Vec2 { v * self } }
impl MulAssign<f64> for Vec2 { fn mul_assign(&mut self, s: f64) { self.x *= s; self.y *= s; } }
impl Div<f64> for Vec2 { type Output = Vec2; fn div(self, s: f64) -> Vec2 { Vec2::new(self.x / s, self.y / s) } }
impl Neg for Vec2 { type Output = Vec2; fn neg(self) -> Vec2 { Vec2::new(-self.x, -self.y) } }

impl std::iter::Sum for Vec2 {
    fn sum<I: Iterator<Item = Vec2>>(iter: I) -> Vec2 { iter.fold(Vec2::ZERO, |acc, v| acc + v) }
}

/// Axis-aligned L x W rectangle centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub length: u32,
    pub width: u32,
}

impl Area {
    pub fn new(length: u32, width: u32) -> Self { Self { length, width } }

    pub fn half_length(&self) -> f64 { self.length as f64 / 2.0 }

    pub fn half_width(&self) -> f64 { self.width as f64 / 2.0 }

    /// Number of unit sampling cells.
    pub fn cell_count(&self) -> usize { self.length as usize * self.width as usize }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= -self.half_length() && p.x <= self.half_length() && p.y >= -self.half_width() && p.y <= self.half_width()
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(-self.half_length(), self.half_length()),
            p.y.clamp(-self.half_width(), self.half_width()),
        )
    }

    /// Uniform sample over the closed rectangle.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        let (hl, hw) = (self.half_length(), self.half_width());
        Vec2::new(rng.gen_range(-hl..=hl), rng.gen_range(-hw..=hw))
    }

    /// Keeps `pos` inside the area after a move; an out-of-range axis has its velocity
    /// component reversed and halved. Returns the corrected `(pos, vel)`.
    pub fn bounce(&self, mut pos: Vec2, mut vel: Vec2) -> (Vec2, Vec2) {
        let (hl, hw) = (self.half_length(), self.half_width());
        if pos.x > hl || pos.x < -hl {
            vel.x *= -0.5;
            pos.x = pos.x.clamp(-hl, hl);
        }
        if pos.y > hw || pos.y < -hw {
            vel.y *= -0.5;
            pos.y = pos.y.clamp(-hw, hw);
        }
        (pos, vel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_magnitude_limits_length() {
        let v = Vec2::new(3.0, 4.0).clamp_magnitude(2.5);
        assert!((v.length() - 2.5).abs() < 1e-12);
        assert!((v.x / v.y - 0.75).abs() < 1e-12);
        let short = Vec2::new(0.1, 0.2);
        assert_eq!(short.clamp_magnitude(1.0), short);
    }

    #[test]
    fn bounce_reflects_and_clamps() {
        let area = Area::new(10, 6);
        let (p, v) = area.bounce(Vec2::new(6.0, -1.0), Vec2::new(2.0, 1.0));
        assert_eq!(p, Vec2::new(5.0, -1.0));
        assert_eq!(v, Vec2::new(-1.0, 1.0));
        let (p, v) = area.bounce(Vec2::new(-7.0, -4.0), Vec2::new(-4.0, -2.0));
        assert_eq!(p, Vec2::new(-5.0, -3.0));
        assert_eq!(v, Vec2::new(2.0, 1.0));
    }

    #[test]
    fn normalized_zero_is_none() {
        assert!(Vec2::ZERO.normalized().is_none());
        let n = Vec2::new(0.0, -2.0).normalized().unwrap();
        assert_eq!(n, Vec2::new(0.0, -1.0));
    }
}
