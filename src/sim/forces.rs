//! Emitters and one-shot forces
//!
//! Emitters acquire batches of particles from the pool with a spatial and
//! velocity pattern. A full pool silently truncates the batch; callers get
//! back how many particles were actually created.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::particle::{Motion, ParticleOptions, Rgba, colors};
use super::pool::ParticlePool;
use crate::consts::*;
use crate::error::EmitError;
use crate::polar_to_cartesian;

/// Radial burst parameters
#[derive(Debug, Clone, Copy)]
pub struct ExplosionOptions {
    pub count: usize,
    /// Minimum speed; each particle gets a speed in [speed, 2 * speed)
    pub speed: f32,
    pub color: Rgba,
    pub radius: f32,
    pub mass: f32,
    /// Fixed life for every particle; `None` draws from [1000, 2000) ms
    pub life_ms: Option<f32>,
}

impl Default for ExplosionOptions {
    fn default() -> Self {
        Self {
            count: EXPLOSION_COUNT,
            speed: EXPLOSION_SPEED,
            color: colors::WHITE,
            radius: DEFAULT_RADIUS,
            mass: DEFAULT_MASS,
            life_ms: None,
        }
    }
}

/// Emit `count` particles at evenly spaced angles around (x, y)
///
/// Returns the number of particles created. Speeds whose doubled range is
/// not finite create nothing.
pub fn explode<R: Rng>(
    pool: &mut ParticlePool,
    rng: &mut R,
    origin: Vec2,
    opts: &ExplosionOptions,
    born_ms: f64,
) -> usize {
    let max_speed = opts.speed * 2.0;
    if !max_speed.is_finite() {
        log::debug!("explosion rejected: speed {} out of range", opts.speed);
        return 0;
    }

    let mut created = 0;
    for i in 0..opts.count {
        let angle = (i as f32 / opts.count as f32) * TAU;
        let speed = if opts.speed > 0.0 {
            rng.random_range(opts.speed..max_speed)
        } else {
            opts.speed
        };
        let life_ms = opts
            .life_ms
            .unwrap_or_else(|| rng.random_range(EXPLOSION_LIFE_MIN_MS..EXPLOSION_LIFE_MAX_MS));

        let particle = ParticleOptions {
            velocity: Some(polar_to_cartesian(speed, angle)),
            mass: opts.mass,
            radius: opts.radius,
            life_ms,
            color: opts.color,
            ..Default::default()
        };
        match pool.acquire(origin, &particle, born_ms, &mut *rng) {
            Ok(_) => created += 1,
            Err(EmitError::PoolExhausted) => {
                log::trace!(
                    "explosion at ({}, {}) truncated to {}/{} particles",
                    origin.x,
                    origin.y,
                    created,
                    opts.count
                );
                break;
            }
            Err(e) => {
                log::debug!("explosion rejected: {}", e);
                break;
            }
        }
    }
    created
}

/// Pull every active particle within `radius` of `center` toward it
///
/// The velocity change is `strength * (radius - d) / d` along the unit vector
/// to the center. Particles sitting exactly on the center are skipped.
/// Returns how many particles were affected.
pub fn apply_gravity_well(pool: &mut ParticlePool, center: Vec2, strength: f32, radius: f32) -> usize {
    if !(strength.is_finite() && radius.is_finite() && radius > 0.0) {
        return 0;
    }
    let mut affected = 0;
    pool.for_each_active(|_, p| {
        let delta = center - p.pos;
        let dist = delta.length();
        if dist < radius && dist > f32::EPSILON {
            let force = strength * (radius - dist) / dist;
            p.vel += (delta / dist) * force;
            affected += 1;
        }
    });
    affected
}

/// Scripted emission patterns
#[derive(Debug, Clone, Copy)]
pub enum Emission {
    /// Particles circling the origin, evenly spaced, ignoring gravity
    Spiral {
        count: usize,
        radius: f32,
        /// Radians per normalized tick
        angular_speed: f32,
        color: Rgba,
        particle_radius: f32,
        life_ms: f32,
    },
    /// Explosion with a fixed life
    Burst {
        count: usize,
        speed: f32,
        color: Rgba,
        radius: f32,
        life_ms: f32,
    },
}

impl Emission {
    pub fn spiral() -> Self {
        Emission::Spiral {
            count: 12,
            radius: 50.0,
            angular_speed: 0.1,
            color: colors::CYAN,
            particle_radius: DEFAULT_RADIUS,
            life_ms: 5000.0,
        }
    }

    pub fn burst() -> Self {
        Emission::Burst {
            count: 16,
            speed: 3.0,
            color: colors::CYAN,
            radius: DEFAULT_RADIUS,
            life_ms: DEFAULT_LIFE_MS,
        }
    }

    pub fn count(&self) -> usize {
        match *self {
            Emission::Spiral { count, .. } | Emission::Burst { count, .. } => count,
        }
    }

    /// Same pattern with a different particle count
    pub fn with_count(mut self, n: usize) -> Self {
        match &mut self {
            Emission::Spiral { count, .. } | Emission::Burst { count, .. } => *count = n,
        }
        self
    }
}

/// Spawn an emission pattern at `origin`; returns particles created
pub fn emit<R: Rng>(
    pool: &mut ParticlePool,
    rng: &mut R,
    origin: Vec2,
    emission: &Emission,
    born_ms: f64,
) -> usize {
    match *emission {
        Emission::Spiral {
            count,
            radius,
            angular_speed,
            color,
            particle_radius,
            life_ms,
        } => {
            let mut created = 0;
            for i in 0..count {
                let angle = (i as f32 / count as f32) * TAU;
                let opts = ParticleOptions {
                    velocity: Some(Vec2::ZERO),
                    radius: particle_radius,
                    life_ms,
                    color,
                    applies_gravity: false,
                    motion: Motion::Orbital {
                        center: origin,
                        radius,
                        angular_speed,
                        angle,
                    },
                    ..Default::default()
                };
                let start = origin + polar_to_cartesian(radius, angle);
                if pool.acquire(start, &opts, born_ms, &mut *rng).is_err() {
                    log::trace!("spiral emission truncated to {}/{}", created, count);
                    break;
                }
                created += 1;
            }
            created
        }
        Emission::Burst {
            count,
            speed,
            color,
            radius,
            life_ms,
        } => {
            let opts = ExplosionOptions {
                count,
                speed,
                color,
                radius,
                life_ms: Some(life_ms),
                ..Default::default()
            };
            explode(pool, rng, origin, &opts, born_ms)
        }
    }
}

/// Impact flavours used by gameplay collision effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImpactKind {
    #[default]
    Default,
    Asteroid,
    Shield,
}

impl ImpactKind {
    pub fn explosion(&self) -> ExplosionOptions {
        match self {
            ImpactKind::Asteroid => ExplosionOptions {
                count: 20,
                speed: 8.0,
                color: colors::ASTEROID_GREY,
                radius: 4.0,
                ..Default::default()
            },
            ImpactKind::Default | ImpactKind::Shield => ExplosionOptions {
                count: 12,
                speed: 5.0,
                color: colors::WHITE,
                radius: 2.0,
                ..Default::default()
            },
        }
    }
}

/// Scale an effect's particle count by the quality density (floored)
pub fn scaled_count(count: usize, density: f32) -> usize {
    if !density.is_finite() || density <= 0.0 {
        return 0;
    }
    (count as f32 * density).floor() as usize
}
