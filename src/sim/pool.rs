//! Fixed-capacity particle pool
//!
//! Slots live in a flat array addressed by stable index. Released slots wait
//! in a pending list until `recycle` runs at the start of the next tick, so a
//! slot freed mid-pass is never handed out again in that same pass.
//! Handles carry a generation that changes on every release, which makes
//! stale handles harmless.

use glam::Vec2;
use rand::Rng;

use super::particle::{Particle, ParticleOptions};
use crate::consts::RANDOM_SPEED;
use crate::error::{ConfigError, EmitError};

/// Stable reference to a pooled particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleHandle {
    index: u32,
    generation: u32,
}

impl ParticleHandle {
    /// Slot index; unique among active particles
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    particle: Particle,
    generation: u32,
    active: bool,
}

impl Slot {
    const EMPTY: Slot = Slot {
        particle: Particle::INERT,
        generation: 0,
        active: false,
    };
}

/// Fixed-size particle allocator
#[derive(Debug)]
pub struct ParticlePool {
    slots: Vec<Slot>,
    /// Indices ready for reuse (popped from the back)
    free: Vec<u32>,
    /// Indices released since the last `recycle`
    pending: Vec<u32>,
    active: usize,
}

impl ParticlePool {
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if capacity > u32::MAX as usize {
            return Err(ConfigError::CapacityTooLarge(capacity));
        }
        Ok(Self {
            slots: vec![Slot::EMPTY; capacity],
            // Reversed so low indices are handed out first
            free: (0..capacity as u32).rev().collect(),
            pending: Vec::with_capacity(capacity),
            active: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Slots that can be acquired right now
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Activate a slot at `pos`, filling unspecified options with defaults
    pub fn acquire<R: Rng>(
        &mut self,
        pos: Vec2,
        options: &ParticleOptions,
        born_ms: f64,
        rng: &mut R,
    ) -> Result<ParticleHandle, EmitError> {
        options.validate()?;
        if !pos.is_finite() {
            return Err(EmitError::InvalidPosition { x: pos.x, y: pos.y });
        }
        let index = self.free.pop().ok_or(EmitError::PoolExhausted)?;

        let vel = options.velocity.unwrap_or_else(|| {
            Vec2::new(
                rng.random_range(-RANDOM_SPEED..RANDOM_SPEED),
                rng.random_range(-RANDOM_SPEED..RANDOM_SPEED),
            )
        });

        let slot = &mut self.slots[index as usize];
        slot.particle = Particle {
            pos,
            vel,
            mass: options.mass,
            radius: options.radius,
            life_ms: options.life_ms,
            born_ms,
            color: options.color,
            bounces: 0,
            max_bounces: options.max_bounces,
            applies_gravity: options.applies_gravity,
            applies_friction: options.applies_friction,
            motion: options.motion,
        };
        slot.active = true;
        self.active += 1;

        Ok(ParticleHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Return a particle's slot to the pool
    ///
    /// Returns false (and changes nothing) for free slots and stale handles.
    pub fn release(&mut self, handle: ParticleHandle) -> bool {
        match self.slots.get(handle.index()) {
            Some(slot) if slot.active && slot.generation == handle.generation => {
                self.release_index(handle.index);
                true
            }
            _ => false,
        }
    }

    fn release_index(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.particle = Particle::INERT;
        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.active -= 1;
        self.pending.push(index);
    }

    /// Make slots released since the last call available again
    pub fn recycle(&mut self) {
        self.free.append(&mut self.pending);
    }

    /// Release every particle; all slots become available immediately
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.particle = Particle::INERT;
            slot.active = false;
            slot.generation = slot.generation.wrapping_add(1);
        }
        log::debug!("pool cleared ({} particles dropped)", self.active);
        self.active = 0;
        self.pending.clear();
        self.free.clear();
        self.free.extend((0..self.slots.len() as u32).rev());
    }

    /// Reallocate with a new capacity, dropping every particle
    pub fn resize(&mut self, capacity: usize) -> Result<(), ConfigError> {
        *self = Self::with_capacity(capacity)?;
        Ok(())
    }

    pub fn is_active(&self, handle: ParticleHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.slots
            .get(handle.index())
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &s.particle)
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &mut s.particle)
    }

    /// Active particle at a raw slot index
    pub fn get_index(&self, index: usize) -> Option<&Particle> {
        self.slots
            .get(index)
            .filter(|s| s.active)
            .map(|s| &s.particle)
    }

    /// Two distinct active particles by slot index
    pub fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut Particle, &mut Particle)> {
        if a == b || a >= self.slots.len() || b >= self.slots.len() {
            return None;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.slots.split_at_mut(hi);
        let (lo_slot, hi_slot) = (&mut head[lo], &mut tail[0]);
        if !lo_slot.active || !hi_slot.active {
            return None;
        }
        if a < b {
            Some((&mut lo_slot.particle, &mut hi_slot.particle))
        } else {
            Some((&mut hi_slot.particle, &mut lo_slot.particle))
        }
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (ParticleHandle, &Particle)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| {
                (
                    ParticleHandle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    &s.particle,
                )
            })
    }

    /// Visit every active particle mutably; order is unspecified
    pub fn for_each_active<F>(&mut self, mut f: F)
    where
        F: FnMut(ParticleHandle, &mut Particle),
    {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.active {
                let handle = ParticleHandle {
                    index: i as u32,
                    generation: slot.generation,
                };
                f(handle, &mut slot.particle);
            }
        }
    }

    /// Release every active particle for which `keep` returns false
    ///
    /// Returns how many were released.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(ParticleHandle, &mut Particle) -> bool,
    {
        let mut released = 0;
        for i in 0..self.slots.len() {
            let slot = &mut self.slots[i];
            if !slot.active {
                continue;
            }
            let handle = ParticleHandle {
                index: i as u32,
                generation: slot.generation,
            };
            if !keep(handle, &mut slot.particle) {
                self.release_index(i as u32);
                released += 1;
            }
        }
        released
    }
}
