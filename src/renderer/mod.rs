//! Render snapshot types
//!
//! Drawing happens outside this crate. The simulation hands out read-only
//! views (`ParticleView`) or packed `ParticleInstance`s each frame.

pub mod instance;

pub use instance::{ParticleInstance, instances_as_bytes};
