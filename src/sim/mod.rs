//! Particle simulation module
//!
//! Everything that runs inside a tick lives here:
//! - `pool`: fixed-capacity slot allocator, the only owner of particles
//! - `quadtree`: per-tick spatial index for collision candidates
//! - `collision`: boundary and pairwise impulse response
//! - `forces`: explosions, gravity wells and scripted emissions
//! - `tick`: the driver that runs the stages in order each frame
//!
//! Single-threaded and frame-driven; no stage blocks or allocates once the
//! scratch buffers have warmed up.

pub mod collision;
pub mod forces;
pub mod particle;
pub mod pool;
pub mod quadtree;
pub mod tick;

pub use collision::{Boundary, overlapping, resolve_boundary, resolve_pair};
pub use forces::{Emission, ExplosionOptions, ImpactKind, apply_gravity_well, emit, explode};
pub use particle::{Motion, PathFn, Particle, ParticleOptions, ParticleView, Rgba, colors, parse_hex_color};
pub use pool::{ParticleHandle, ParticlePool};
pub use quadtree::{Quadtree, Rect};
pub use tick::{ParticleSystem, SimPhase, TickStats};
