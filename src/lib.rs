//! Particle Engine - pooled 2D particle simulation for in-game visual effects
//!
//! Core modules:
//! - `sim`: Particle pool, spatial partition, collisions, emitters and the tick driver
//! - `settings`: Quality presets, physics tuning and the FPS quality governor
//! - `renderer`: Read-only snapshot types consumed by an external renderer
//! - `error`: Error types for emission and configuration

pub mod error;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, EmitError, SettingsError};
pub use settings::{PhysicsConfig, QualityGovernor, QualityPreset, Settings};
pub use sim::{ParticleHandle, ParticleOptions, ParticleSystem, ParticleView, SimPhase};

use glam::Vec2;

/// Simulation tuning constants
pub mod consts {
    /// Frame length the physics scales are tuned for (~60 Hz)
    pub const BASELINE_FRAME_MS: f32 = 16.0;

    /// Downward acceleration per normalized tick
    pub const GRAVITY: f32 = 0.1;
    /// Velocity damping per normalized tick
    pub const FRICTION: f32 = 0.98;
    /// Fraction of velocity kept after a wall or particle collision
    pub const RESTITUTION: f32 = 0.8;

    /// Particle defaults
    pub const DEFAULT_MASS: f32 = 1.0;
    pub const DEFAULT_RADIUS: f32 = 2.0;
    pub const DEFAULT_LIFE_MS: f32 = 2000.0;
    pub const DEFAULT_MAX_BOUNCES: u32 = 3;
    /// Unspecified velocities are drawn from [-RANDOM_SPEED, RANDOM_SPEED) per axis
    pub const RANDOM_SPEED: f32 = 5.0;

    /// Explosion defaults
    pub const EXPLOSION_COUNT: usize = 20;
    pub const EXPLOSION_SPEED: f32 = 5.0;
    pub const EXPLOSION_LIFE_MIN_MS: f32 = 1000.0;
    pub const EXPLOSION_LIFE_MAX_MS: f32 = 2000.0;

    /// Quadtree leaf capacity before subdividing
    pub const BUCKET_CAPACITY: usize = 4;
    /// Deepest quadtree level; leaves at this depth grow instead of splitting
    pub const MAX_TREE_DEPTH: u32 = 8;

    /// Pool size used when no quality preset is supplied
    pub const DEFAULT_CAPACITY: usize = 1000;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    if angle.abs() > 16.0 * TAU {
        angle %= TAU;
    }
    while angle >= PI {
        angle -= TAU;
    }
    while angle < -PI {
        angle += TAU;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}
