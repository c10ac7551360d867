//! Particle record and spawn options
//!
//! Particles are plain `Copy` data so the pool can store them in a flat
//! array and reset them in place. Scripted motion is a tagged variant rather
//! than a per-particle closure.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::EmitError;
use crate::normalize_angle;

use super::quadtree::Rect;

/// RGBA color, components in 0..=1
pub type Rgba = [f32; 4];

/// Palette used by the built-in emitters
pub mod colors {
    use super::Rgba;

    pub const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];
    pub const CYAN: Rgba = [0.0, 1.0, 1.0, 1.0];
    /// #8b8b8b
    pub const ASTEROID_GREY: Rgba = [139.0 / 255.0, 139.0 / 255.0, 139.0 / 255.0, 1.0];
    pub const INERT: Rgba = [0.0, 0.0, 0.0, 0.0];
}

/// Parse a CSS-style `#rgb` or `#rrggbb` color
pub fn parse_hex_color(s: &str) -> Option<Rgba> {
    let hex = s.trim().strip_prefix('#')?;
    let channel = |v: u8| v as f32 / 255.0;
    match hex.len() {
        3 => {
            let mut out = [1.0; 4];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = channel(v * 17);
            }
            Some(out)
        }
        6 => {
            let mut out = [1.0; 4];
            for i in 0..3 {
                let v = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
                out[i] = channel(v);
            }
            Some(out)
        }
        _ => None,
    }
}

/// Path function for `Motion::Custom`: (origin, elapsed ms) -> position
pub type PathFn = fn(Vec2, f32) -> Vec2;

/// How a particle's position advances each tick
#[derive(Debug, Clone, Copy, Default)]
pub enum Motion {
    /// Velocity integration with gravity and friction
    #[default]
    Default,
    /// Circles `center` at fixed `radius`; `angle` advances by `angular_speed` per normalized tick
    Orbital {
        center: Vec2,
        radius: f32,
        angular_speed: f32,
        angle: f32,
    },
    /// Position is `path(origin, elapsed_ms)`
    Custom { origin: Vec2, path: PathFn },
}

impl Motion {
    pub fn is_override(&self) -> bool {
        !matches!(self, Motion::Default)
    }
}

/// A simulated particle
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub mass: f32,
    pub radius: f32,
    /// Remaining life in milliseconds
    pub life_ms: f32,
    /// Simulation clock at creation
    pub born_ms: f64,
    pub color: Rgba,
    pub bounces: u32,
    pub max_bounces: u32,
    pub applies_gravity: bool,
    pub applies_friction: bool,
    pub motion: Motion,
}

impl Particle {
    /// State of a free slot: zero life, no motion, invisible
    pub const INERT: Particle = Particle {
        pos: Vec2::ZERO,
        vel: Vec2::ZERO,
        mass: DEFAULT_MASS,
        radius: DEFAULT_RADIUS,
        life_ms: 0.0,
        born_ms: 0.0,
        color: colors::INERT,
        bounces: 0,
        max_bounces: 0,
        applies_gravity: false,
        applies_friction: false,
        motion: Motion::Default,
    };

    /// Axis-aligned bounding box
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.pos, Vec2::splat(self.radius))
    }

    /// Inverse mass for impulse resolution
    #[inline]
    pub fn inv_mass(&self) -> f32 {
        1.0 / self.mass
    }

    pub fn momentum(&self) -> Vec2 {
        self.vel * self.mass
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite() && self.life_ms.is_finite()
    }

    pub fn bounces_exhausted(&self) -> bool {
        self.bounces > self.max_bounces
    }

    /// Advance position by one step of size `dt` (normalized ticks)
    ///
    /// Override motions set the position directly and derive velocity from
    /// the displacement.
    pub fn integrate(&mut self, dt: f32, clock_ms: f64, gravity: f32, friction: f32) {
        match self.motion {
            Motion::Default => {
                if self.applies_gravity {
                    self.vel.y += gravity * dt;
                }
                if self.applies_friction {
                    self.vel *= friction.powf(dt);
                }
                self.pos += self.vel * dt;
            }
            Motion::Orbital {
                center,
                radius,
                angular_speed,
                ref mut angle,
            } => {
                *angle = normalize_angle(*angle + angular_speed * dt);
                let next = center + Vec2::new(angle.cos(), angle.sin()) * radius;
                self.move_to(next, dt);
            }
            Motion::Custom { origin, path } => {
                let elapsed = (clock_ms - self.born_ms).max(0.0) as f32;
                let next = path(origin, elapsed);
                self.move_to(next, dt);
            }
        }
    }

    fn move_to(&mut self, next: Vec2, dt: f32) {
        if !next.is_finite() {
            return;
        }
        if dt > 0.0 {
            self.vel = (next - self.pos) / dt;
        }
        self.pos = next;
    }
}

/// Spawn options; unspecified fields take the engine defaults
#[derive(Debug, Clone, Copy)]
pub struct ParticleOptions {
    /// `None` picks a random velocity in [-5, 5) per axis
    pub velocity: Option<Vec2>,
    pub mass: f32,
    pub radius: f32,
    pub life_ms: f32,
    pub color: Rgba,
    pub applies_gravity: bool,
    pub applies_friction: bool,
    pub max_bounces: u32,
    pub motion: Motion,
}

impl Default for ParticleOptions {
    fn default() -> Self {
        Self {
            velocity: None,
            mass: DEFAULT_MASS,
            radius: DEFAULT_RADIUS,
            life_ms: DEFAULT_LIFE_MS,
            color: colors::WHITE,
            applies_gravity: true,
            applies_friction: true,
            max_bounces: DEFAULT_MAX_BOUNCES,
            motion: Motion::Default,
        }
    }
}

impl ParticleOptions {
    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.velocity = Some(vel);
        self
    }

    pub fn with_life(mut self, life_ms: f32) -> Self {
        self.life_ms = life_ms;
        self
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    /// Reject values that would corrupt the simulation
    pub fn validate(&self) -> Result<(), EmitError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(EmitError::InvalidRadius(self.radius));
        }
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(EmitError::InvalidMass(self.mass));
        }
        if !(self.life_ms.is_finite() && self.life_ms > 0.0) {
            return Err(EmitError::InvalidLife(self.life_ms));
        }
        if let Some(v) = self.velocity {
            if !v.is_finite() {
                return Err(EmitError::InvalidVelocity { x: v.x, y: v.y });
            }
        }
        Ok(())
    }
}

/// Quality-independent description of a particle for renderers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleView {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: Rgba,
}

impl From<&Particle> for ParticleView {
    fn from(p: &Particle) -> Self {
        Self {
            pos: p.pos,
            vel: p.vel,
            radius: p.radius,
            color: p.color,
        }
    }
}
