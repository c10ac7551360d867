//! Instance types handed to the external renderer

use bytemuck::{Pod, Zeroable};

use crate::sim::Particle;

/// One particle as laid out in a GPU instance buffer
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 2],
    /// Exposed so the renderer can decide on motion blur
    pub velocity: [f32; 2],
    pub color: [f32; 4],
    pub radius: f32,
}

impl ParticleInstance {
    pub const fn new(x: f32, y: f32, radius: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            velocity: [0.0, 0.0],
            color,
            radius,
        }
    }

    /// Speed in pixels per normalized tick
    pub fn speed(&self) -> f32 {
        let [vx, vy] = self.velocity;
        (vx * vx + vy * vy).sqrt()
    }
}

impl From<&Particle> for ParticleInstance {
    fn from(p: &Particle) -> Self {
        Self {
            position: p.pos.to_array(),
            velocity: p.vel.to_array(),
            color: p.color,
            radius: p.radius,
        }
    }
}

/// View an instance slice as raw bytes for upload
pub fn instances_as_bytes(instances: &[ParticleInstance]) -> &[u8] {
    bytemuck::cast_slice(instances)
}
