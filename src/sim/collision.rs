//! Collision detection and response
//!
//! Two cases: particles against the rectangular simulation boundary, and
//! particle pairs resolved with an elastic impulse along the contact normal.
//! Neither touches pool bookkeeping; only velocity and position change.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::particle::Particle;
use super::quadtree::Rect;

/// Pairs closer than this are treated as coincident and skipped
const MIN_SEPARATION: f32 = 1.0e-6;

/// Rectangular simulation area anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub width: f32,
    pub height: f32,
}

impl Boundary {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn rect(&self) -> Rect {
        Rect::new(Vec2::ZERO, Vec2::new(self.width, self.height))
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.rect().contains_point(p)
    }
}

/// Reflect off one axis of the boundary; returns whether a wall was hit
#[inline]
fn bounce_axis(pos: &mut f32, vel: &mut f32, radius: f32, extent: f32, restitution: f32) -> bool {
    let hit = if *pos - radius < 0.0 {
        *pos = radius;
        *vel = vel.abs() * restitution;
        true
    } else if *pos + radius > extent {
        *pos = extent - radius;
        *vel = -vel.abs() * restitution;
        true
    } else {
        false
    };
    // Particles wider than the boundary still end up inside it
    *pos = pos.clamp(0.0, extent);
    hit
}

/// Keep a particle inside the boundary, reflecting velocity on each violated axis
///
/// Each wall hit counts as one bounce.
pub fn resolve_boundary(p: &mut Particle, boundary: &Boundary, restitution: f32) -> bool {
    let hit_x = bounce_axis(&mut p.pos.x, &mut p.vel.x, p.radius, boundary.width, restitution);
    let hit_y = bounce_axis(&mut p.pos.y, &mut p.vel.y, p.radius, boundary.height, restitution);
    p.bounces += hit_x as u32 + hit_y as u32;
    hit_x || hit_y
}

/// Check whether two particles overlap
#[inline]
pub fn overlapping(a: &Particle, b: &Particle) -> bool {
    let r = a.radius + b.radius;
    a.pos.distance_squared(b.pos) < r * r
}

/// Resolve an overlapping pair with an impulse along the contact normal
///
/// Standard impulse: j = -(1 + e)(v_rel · n) / (1/m_a + 1/m_b).
/// Returns false when the pair doesn't overlap, is already separating, or is
/// degenerate (coincident centers).
pub fn resolve_pair(a: &mut Particle, b: &mut Particle, restitution: f32) -> bool {
    let delta = b.pos - a.pos;
    let dist = delta.length();
    if !(dist > MIN_SEPARATION) || dist >= a.radius + b.radius {
        return false;
    }

    let normal = delta / dist;
    let rel_vel = b.vel - a.vel;
    let vel_along_normal = rel_vel.dot(normal);
    if !(vel_along_normal < 0.0) {
        return false;
    }

    let inv_a = a.inv_mass();
    let inv_b = b.inv_mass();
    let j = -(1.0 + restitution) * vel_along_normal / (inv_a + inv_b);
    let impulse = normal * j;

    let va = a.vel - impulse * inv_a;
    let vb = b.vel + impulse * inv_b;
    if !(va.is_finite() && vb.is_finite()) {
        return false;
    }
    a.vel = va;
    b.vel = vb;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::RESTITUTION;

    fn particle(pos: Vec2, vel: Vec2, mass: f32, radius: f32) -> Particle {
        Particle {
            pos,
            vel,
            mass,
            radius,
            life_ms: 1000.0,
            max_bounces: 3,
            ..Particle::INERT
        }
    }

    #[test]
    fn test_left_wall_reflects() {
        let b = Boundary::new(100.0, 100.0);
        let mut p = particle(Vec2::new(1.0, 50.0), Vec2::new(-10.0, 0.0), 1.0, 2.0);
        assert!(resolve_boundary(&mut p, &b, RESTITUTION));
        assert_eq!(p.pos.x, 2.0);
        assert!((p.vel.x - 8.0).abs() < 1e-5);
        assert_eq!(p.bounces, 1);
    }

    #[test]
    fn test_bottom_right_corner_counts_two_bounces() {
        let b = Boundary::new(100.0, 100.0);
        let mut p = particle(Vec2::new(101.0, 105.0), Vec2::new(5.0, 5.0), 1.0, 2.0);
        resolve_boundary(&mut p, &b, RESTITUTION);
        assert_eq!(p.pos, Vec2::new(98.0, 98.0));
        assert!((p.vel - Vec2::new(-4.0, -4.0)).length() < 1e-5);
        assert_eq!(p.bounces, 2);
    }

    #[test]
    fn test_inside_untouched() {
        let b = Boundary::new(100.0, 100.0);
        let mut p = particle(Vec2::new(50.0, 50.0), Vec2::new(3.0, -3.0), 1.0, 2.0);
        assert!(!resolve_boundary(&mut p, &b, RESTITUTION));
        assert_eq!(p.vel, Vec2::new(3.0, -3.0));
        assert_eq!(p.bounces, 0);
    }

    #[test]
    fn test_oversized_particle_clamped_inside() {
        let b = Boundary::new(10.0, 10.0);
        let mut p = particle(Vec2::new(12.0, 5.0), Vec2::new(1.0, 0.0), 1.0, 20.0);
        resolve_boundary(&mut p, &b, RESTITUTION);
        assert!(b.contains(p.pos));
    }

    #[test]
    fn test_head_on_equal_masses() {
        let mut a = particle(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), 1.0, 2.0);
        let mut b = particle(Vec2::new(3.0, 0.0), Vec2::new(-1.0, 0.0), 1.0, 2.0);
        assert!(resolve_pair(&mut a, &mut b, RESTITUTION));
        // Relative velocity reverses and shrinks by the restitution factor
        assert!((a.vel.x - (-0.8)).abs() < 1e-5);
        assert!((b.vel.x - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_momentum_conserved_unequal_masses() {
        let mut a = particle(Vec2::new(0.0, 0.0), Vec2::new(4.0, 1.0), 3.0, 2.0);
        let mut b = particle(Vec2::new(2.0, 1.0), Vec2::new(-2.0, 0.5), 0.5, 2.0);
        let before = a.momentum() + b.momentum();
        assert!(resolve_pair(&mut a, &mut b, RESTITUTION));
        let after = a.momentum() + b.momentum();
        assert!((before - after).length() < 1e-4);
    }

    #[test]
    fn test_separating_pair_skipped() {
        let mut a = particle(Vec2::new(0.0, 0.0), Vec2::new(-1.0, 0.0), 1.0, 2.0);
        let mut b = particle(Vec2::new(3.0, 0.0), Vec2::new(1.0, 0.0), 1.0, 2.0);
        assert!(!resolve_pair(&mut a, &mut b, RESTITUTION));
        assert_eq!(a.vel, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_non_overlapping_pair_skipped() {
        let mut a = particle(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), 1.0, 2.0);
        let mut b = particle(Vec2::new(10.0, 0.0), Vec2::new(-1.0, 0.0), 1.0, 2.0);
        assert!(!overlapping(&a, &b));
        assert!(!resolve_pair(&mut a, &mut b, RESTITUTION));
    }

    #[test]
    fn test_coincident_pair_skipped_without_nan() {
        let mut a = particle(Vec2::new(5.0, 5.0), Vec2::new(1.0, 0.0), 1.0, 2.0);
        let mut b = particle(Vec2::new(5.0, 5.0), Vec2::new(-1.0, 0.0), 1.0, 2.0);
        assert!(!resolve_pair(&mut a, &mut b, RESTITUTION));
        assert!(a.is_finite() && b.is_finite());
    }

    #[test]
    fn test_boundary_validity() {
        assert!(Boundary::new(800.0, 600.0).is_valid());
        assert!(!Boundary::new(0.0, 600.0).is_valid());
        assert!(!Boundary::new(800.0, f32::NAN).is_valid());
    }
}
