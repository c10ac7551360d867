//! Per-frame simulation driver
//!
//! `ParticleSystem` owns the pool and every piece of per-tick scratch state.
//! The host calls `tick` once per animation frame with the elapsed
//! milliseconds; physics scales assume a 16 ms frame.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::{Boundary, resolve_boundary, resolve_pair};
use super::forces::{self, Emission, ExplosionOptions, ImpactKind};
use super::particle::{Particle, ParticleOptions, ParticleView};
use super::pool::{ParticleHandle, ParticlePool};
use super::quadtree::Quadtree;
use crate::consts::*;
use crate::error::{ConfigError, EmitError};
use crate::renderer::ParticleInstance;
use crate::settings::{PhysicsConfig, QualityPreset, Settings};

/// Whether any particle is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimPhase {
    /// No active particles; ticks only advance the clock
    Idle,
    /// At least one active particle
    Active,
}

/// Counters from the most recent tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub simulated: usize,
    pub wall_hits: usize,
    pub pair_checks: usize,
    pub pair_hits: usize,
    pub released: usize,
}

/// Pooled particle simulation
#[derive(Debug)]
pub struct ParticleSystem {
    pool: ParticlePool,
    tree: Quadtree,
    boundary: Boundary,
    physics: PhysicsConfig,
    /// Effect count multiplier from the quality preset
    density: f32,
    rng: Pcg32,
    clock_ms: f64,
    phase: SimPhase,
    stats: TickStats,
    // Scratch buffers reused across ticks
    active: Vec<usize>,
    candidates: Vec<usize>,
}

impl ParticleSystem {
    pub fn new(capacity: usize, width: f32, height: f32, seed: u64) -> Result<Self, ConfigError> {
        let boundary = Boundary::new(width, height);
        if !boundary.is_valid() {
            return Err(ConfigError::InvalidBoundary { width, height });
        }
        let pool = ParticlePool::with_capacity(capacity)?;
        log::debug!(
            "particle system: capacity {}, boundary {}x{}",
            capacity,
            width,
            height
        );
        Ok(Self {
            pool,
            tree: Quadtree::new(),
            boundary,
            physics: PhysicsConfig::default(),
            density: 1.0,
            rng: Pcg32::seed_from_u64(seed),
            clock_ms: 0.0,
            phase: SimPhase::Idle,
            stats: TickStats::default(),
            active: Vec::with_capacity(capacity),
            candidates: Vec::new(),
        })
    }

    /// System sized and tuned by a quality preset
    pub fn with_settings(settings: &Settings, width: f32, height: f32, seed: u64) -> Result<Self, ConfigError> {
        let mut system = Self::new(settings.max_particles(), width, height, seed)?;
        system.physics = settings.physics();
        system.density = settings.quality.particle_density();
        Ok(system)
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    /// Simulated milliseconds since creation
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    pub fn last_tick_stats(&self) -> TickStats {
        self.stats
    }

    pub fn particle(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.pool.get(handle)
    }

    /// Advance the simulation by `delta_ms`
    ///
    /// Deltas are not clamped; non-finite or negative deltas are ignored.
    pub fn tick(&mut self, delta_ms: f32) {
        if !delta_ms.is_finite() || delta_ms < 0.0 {
            log::warn!("ignoring tick with delta {}ms", delta_ms);
            return;
        }

        self.pool.recycle();
        self.clock_ms += delta_ms as f64;
        self.stats = TickStats::default();

        if self.pool.is_empty() {
            self.phase = SimPhase::Idle;
            return;
        }
        self.phase = SimPhase::Active;

        let dt = delta_ms / BASELINE_FRAME_MS;
        let clock_ms = self.clock_ms;
        let boundary = self.boundary;
        let physics = self.physics;
        let (gravity, friction) = if physics.physics_enabled {
            (physics.gravity, physics.friction)
        } else {
            (0.0, 1.0)
        };

        // 1-2. Move, then keep inside the boundary
        let mut wall_hits = 0;
        self.active.clear();
        let active = &mut self.active;
        self.pool.for_each_active(|h, p| {
            p.integrate(dt, clock_ms, gravity, friction);
            if resolve_boundary(p, &boundary, physics.restitution) {
                wall_hits += 1;
            }
            active.push(h.index());
        });
        self.stats.simulated = self.active.len();
        self.stats.wall_hits = wall_hits;

        // 3-4. Index the moved positions, then resolve overlapping pairs.
        // Pair response only changes velocity, so the index stays valid.
        if physics.collisions_enabled {
            self.rebuild_tree();
            self.resolve_pairs(physics.restitution);
        }

        // 5. Age and retire
        self.stats.released = self.pool.retain(|_, p| {
            p.life_ms -= delta_ms;
            if !p.is_finite() {
                log::debug!("dropping particle with non-finite state");
                return false;
            }
            p.life_ms > 0.0 && !p.bounces_exhausted()
        });

        if self.pool.is_empty() {
            self.phase = SimPhase::Idle;
        }
    }

    /// Index every active particle; the root also covers anything left
    /// outside the boundary (e.g. radius wider than the area)
    fn rebuild_tree(&mut self) {
        let root = self
            .pool
            .iter_active()
            .map(|(_, p)| p.bounds())
            .filter(|b| b.min.is_finite() && b.max.is_finite())
            .fold(self.boundary.rect(), |acc, b| acc.union(&b));
        self.tree.rebuild(
            root,
            self.pool.iter_active().map(|(h, p)| (h.index(), p.bounds())),
        );
    }

    fn resolve_pairs(&mut self, restitution: f32) {
        for &a in &self.active {
            let Some(region) = self.pool.get_index(a).map(|p| p.bounds()) else {
                continue;
            };
            self.tree.query(region, &mut self.candidates);
            for &b in &self.candidates {
                // Each unordered pair is tested once
                if b <= a {
                    continue;
                }
                if let Some((pa, pb)) = self.pool.pair_mut(a, b) {
                    self.stats.pair_checks += 1;
                    if resolve_pair(pa, pb, restitution) {
                        self.stats.pair_hits += 1;
                    }
                }
            }
        }
    }

    /// Spawn one particle at (x, y)
    pub fn add_particle(&mut self, x: f32, y: f32, options: &ParticleOptions) -> Result<ParticleHandle, EmitError> {
        let handle = self
            .pool
            .acquire(Vec2::new(x, y), options, self.clock_ms, &mut self.rng)?;
        self.phase = SimPhase::Active;
        Ok(handle)
    }

    /// Radial burst; returns how many particles were created
    pub fn add_explosion(&mut self, x: f32, y: f32, options: &ExplosionOptions) -> usize {
        let created = forces::explode(&mut self.pool, &mut self.rng, Vec2::new(x, y), options, self.clock_ms);
        self.mark_active(created)
    }

    /// One-shot pull toward (x, y); call every tick for a continuous field
    pub fn add_gravity_well(&mut self, x: f32, y: f32, strength: f32, radius: f32) -> usize {
        if !self.physics.physics_enabled {
            return 0;
        }
        forces::apply_gravity_well(&mut self.pool, Vec2::new(x, y), strength, radius)
    }

    /// Spawn an emission pattern, scaled by the quality density
    pub fn add_emission(&mut self, x: f32, y: f32, emission: &Emission) -> usize {
        let scaled = emission.with_count(forces::scaled_count(emission.count(), self.density));
        let created = forces::emit(&mut self.pool, &mut self.rng, Vec2::new(x, y), &scaled, self.clock_ms);
        self.mark_active(created)
    }

    /// Impact effect for a gameplay collision, scaled by the quality density
    pub fn add_impact(&mut self, x: f32, y: f32, kind: ImpactKind) -> usize {
        let mut options = kind.explosion();
        options.count = forces::scaled_count(options.count, self.density);
        self.add_explosion(x, y, &options)
    }

    fn mark_active(&mut self, created: usize) -> usize {
        if created > 0 {
            self.phase = SimPhase::Active;
        }
        created
    }

    /// Visit position, velocity, radius and color of each live particle
    pub fn for_each_active_particle<F>(&self, mut visit: F)
    where
        F: FnMut(ParticleView),
    {
        for (_, p) in self.pool.iter_active() {
            visit(ParticleView::from(p));
        }
    }

    /// Fill `out` with GPU-ready instances for every live particle
    pub fn write_instances(&self, out: &mut Vec<ParticleInstance>) {
        out.clear();
        out.extend(self.pool.iter_active().map(|(_, p)| ParticleInstance::from(p)));
    }

    /// Reallocate the pool; every particle is dropped
    pub fn set_capacity(&mut self, max_particles: usize) -> Result<(), ConfigError> {
        let dropped = self.pool.active_count();
        self.pool.resize(max_particles)?;
        self.tree.clear();
        self.active = Vec::with_capacity(max_particles);
        self.phase = SimPhase::Idle;
        log::debug!(
            "particle pool resized to {} ({} particles dropped)",
            max_particles,
            dropped
        );
        Ok(())
    }

    pub fn set_boundary(&mut self, width: f32, height: f32) -> Result<(), ConfigError> {
        let boundary = Boundary::new(width, height);
        if !boundary.is_valid() {
            return Err(ConfigError::InvalidBoundary { width, height });
        }
        log::debug!("particle boundary {}x{}", width, height);
        self.boundary = boundary;
        Ok(())
    }

    pub fn set_physics(&mut self, physics: PhysicsConfig) {
        self.physics = physics;
    }

    /// Apply a quality preset: pool size, density and physics stages
    pub fn apply_quality(&mut self, preset: QualityPreset) -> Result<(), ConfigError> {
        if preset.max_particles() != self.capacity() {
            self.set_capacity(preset.max_particles())?;
        }
        self.density = preset.particle_density();
        self.physics.physics_enabled = preset.particle_physics();
        self.physics.collisions_enabled = preset.particle_collisions();
        log::info!("particle quality set to {}", preset.as_str());
        Ok(())
    }

    /// Drop every particle without reallocating
    pub fn clear(&mut self) {
        self.pool.clear();
        self.tree.clear();
        self.phase = SimPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Motion;

    fn system(capacity: usize) -> ParticleSystem {
        ParticleSystem::new(capacity, 800.0, 600.0, 12345).unwrap()
    }

    fn still(life_ms: f32) -> ParticleOptions {
        ParticleOptions {
            velocity: Some(Vec2::ZERO),
            life_ms,
            applies_gravity: false,
            applies_friction: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert_eq!(
            ParticleSystem::new(0, 800.0, 600.0, 1).unwrap_err(),
            ConfigError::ZeroCapacity
        );
        assert!(matches!(
            ParticleSystem::new(10, -1.0, 600.0, 1),
            Err(ConfigError::InvalidBoundary { .. })
        ));
    }

    #[test]
    fn test_idle_until_emission() {
        let mut sim = system(16);
        sim.tick(16.0);
        assert_eq!(sim.phase(), SimPhase::Idle);
        assert_eq!(sim.clock_ms(), 16.0);

        sim.add_particle(100.0, 100.0, &still(100.0)).unwrap();
        assert_eq!(sim.phase(), SimPhase::Active);
        sim.tick(16.0);
        assert_eq!(sim.phase(), SimPhase::Active);
    }

    #[test]
    fn test_explosion_single_euler_step() {
        let mut sim = system(64);
        let opts = ExplosionOptions {
            count: 8,
            speed: 5.0,
            ..Default::default()
        };
        assert_eq!(sim.add_explosion(100.0, 100.0, &opts), 8);
        assert_eq!(sim.active_count(), 8);

        sim.tick(16.0);
        let start = Vec2::new(100.0, 100.0);
        let mut visited = 0;
        sim.for_each_active_particle(|p| {
            visited += 1;
            assert_ne!(p.pos, start);
            // One step at dt = 1: position moved by exactly the updated velocity
            assert!((p.pos - start - p.vel).length() < 1e-4);
        });
        assert_eq!(visited, 8);
    }

    #[test]
    fn test_life_expiry() {
        let mut sim = system(4);
        let h = sim.add_particle(100.0, 100.0, &still(50.0)).unwrap();
        sim.tick(16.0);
        sim.tick(16.0);
        sim.tick(16.0);
        assert!(sim.particle(h).is_some());
        sim.tick(16.0);
        assert!(sim.particle(h).is_none());
        assert_eq!(sim.phase(), SimPhase::Idle);
        assert_eq!(sim.last_tick_stats().released, 1);
    }

    #[test]
    fn test_bounce_limit_releases() {
        let mut sim = system(4);
        let opts = ParticleOptions {
            velocity: Some(Vec2::new(-50.0, 0.0)),
            max_bounces: 0,
            applies_gravity: false,
            applies_friction: false,
            ..Default::default()
        };
        let h = sim.add_particle(10.0, 300.0, &opts).unwrap();
        sim.tick(16.0);
        assert!(sim.particle(h).is_none());
    }

    #[test]
    fn test_wall_bounce_keeps_particle_inside() {
        let mut sim = system(4);
        let opts = ParticleOptions {
            velocity: Some(Vec2::new(-50.0, 0.0)),
            applies_gravity: false,
            applies_friction: false,
            ..Default::default()
        };
        let h = sim.add_particle(10.0, 300.0, &opts).unwrap();
        sim.tick(16.0);
        let p = sim.particle(h).unwrap();
        assert_eq!(p.pos.x, p.radius);
        assert!((p.vel.x - 40.0).abs() < 1e-4);
        assert_eq!(p.bounces, 1);
    }

    #[test]
    fn test_pairwise_collision_in_tick() {
        let mut sim = system(4);
        let mut a = still(1000.0);
        a.velocity = Some(Vec2::new(1.0, 0.0));
        let mut b = still(1000.0);
        b.velocity = Some(Vec2::new(-1.0, 0.0));
        let ha = sim.add_particle(100.0, 100.0, &a).unwrap();
        let hb = sim.add_particle(105.0, 100.0, &b).unwrap();

        sim.tick(16.0);
        // After moving they are 3 apart with radii 2 + 2
        assert_eq!(sim.last_tick_stats().pair_hits, 1);
        assert!(sim.particle(ha).unwrap().vel.x < 0.0);
        assert!(sim.particle(hb).unwrap().vel.x > 0.0);
    }

    #[test]
    fn test_collisions_disabled_by_quality() {
        let mut sim = system(4);
        sim.apply_quality(QualityPreset::Medium).unwrap();
        assert_eq!(sim.capacity(), 500);
        let mut a = still(1000.0);
        a.velocity = Some(Vec2::new(1.0, 0.0));
        sim.add_particle(100.0, 100.0, &a).unwrap();
        sim.add_particle(103.0, 100.0, &still(1000.0)).unwrap();
        sim.tick(16.0);
        assert_eq!(sim.last_tick_stats().pair_checks, 0);
    }

    #[test]
    fn test_set_capacity_clears() {
        let mut sim = system(1000);
        for i in 0..500 {
            sim.add_particle(10.0 + i as f32, 100.0, &still(5000.0)).unwrap();
        }
        assert_eq!(sim.active_count(), 500);
        sim.set_capacity(200).unwrap();
        assert_eq!(sim.active_count(), 0);
        assert_eq!(sim.capacity(), 200);
        let mut visited = 0;
        sim.for_each_active_particle(|_| visited += 1);
        assert_eq!(visited, 0);
        assert!(sim.set_capacity(0).is_err());
    }

    #[test]
    fn test_exhaustion_is_silent_for_emitters() {
        let mut sim = system(10);
        assert_eq!(sim.add_explosion(100.0, 100.0, &ExplosionOptions::default()), 10);
        assert_eq!(sim.add_explosion(100.0, 100.0, &ExplosionOptions::default()), 0);
        assert_eq!(
            sim.add_particle(1.0, 1.0, &ParticleOptions::default()),
            Err(EmitError::PoolExhausted)
        );
    }

    #[test]
    fn test_released_slots_reusable_next_tick() {
        let mut sim = system(1);
        sim.add_particle(100.0, 100.0, &still(10.0)).unwrap();
        sim.tick(16.0);
        assert_eq!(sim.active_count(), 0);
        // Slot freed during the tick comes back at the start of the next one
        sim.tick(16.0);
        assert!(sim.add_particle(100.0, 100.0, &still(10.0)).is_ok());
    }

    #[test]
    fn test_gravity_well_through_system() {
        let mut sim = system(4);
        let h = sim.add_particle(110.0, 100.0, &still(1000.0)).unwrap();
        assert_eq!(sim.add_gravity_well(100.0, 100.0, 1.0, 100.0), 1);
        assert!(sim.particle(h).unwrap().vel.x < 0.0);

        sim.apply_quality(QualityPreset::Low).unwrap();
        assert_eq!(sim.add_gravity_well(100.0, 100.0, 1.0, 100.0), 0);
    }

    #[test]
    fn test_spiral_emission_scaled_by_density() {
        let settings = Settings::from_preset(QualityPreset::Low);
        let mut sim = ParticleSystem::with_settings(&settings, 800.0, 600.0, 3).unwrap();
        // 12 * 0.4
        assert_eq!(sim.add_emission(400.0, 300.0, &Emission::spiral()), 4);
        for _ in 0..10 {
            sim.tick(16.0);
        }
        sim.for_each_active_particle(|p| {
            assert!(((p.pos - Vec2::new(400.0, 300.0)).length() - 50.0).abs() < 1e-2);
        });
        assert_eq!(sim.active_count(), 4);
    }

    #[test]
    fn test_custom_motion_then_boundary() {
        fn runaway(origin: Vec2, elapsed: f32) -> Vec2 {
            origin + Vec2::new(elapsed, 0.0)
        }
        let mut sim = system(4);
        let opts = ParticleOptions {
            motion: Motion::Custom {
                origin: Vec2::new(700.0, 300.0),
                path: runaway,
            },
            max_bounces: 100,
            ..still(10_000.0)
        };
        let h = sim.add_particle(700.0, 300.0, &opts).unwrap();
        for _ in 0..20 {
            sim.tick(16.0);
        }
        let p = sim.particle(h).unwrap();
        assert!(sim.boundary().contains(p.pos));
        assert!(p.bounces > 0);
    }

    #[test]
    fn test_large_delta_no_nan() {
        let mut sim = system(64);
        sim.add_explosion(400.0, 300.0, &ExplosionOptions::default());
        sim.tick(60_000.0 * 0.01);
        sim.for_each_active_particle(|p| {
            assert!(p.pos.is_finite() && p.vel.is_finite());
        });
    }

    #[test]
    fn test_invalid_delta_ignored() {
        let mut sim = system(4);
        sim.add_particle(100.0, 100.0, &still(100.0)).unwrap();
        sim.tick(f32::NAN);
        sim.tick(-5.0);
        assert_eq!(sim.clock_ms(), 0.0);
        assert_eq!(sim.active_count(), 1);
    }

    #[test]
    fn test_set_boundary() {
        let mut sim = system(4);
        sim.set_boundary(1024.0, 768.0).unwrap();
        assert_eq!(sim.boundary(), Boundary::new(1024.0, 768.0));
        assert!(sim.set_boundary(0.0, 10.0).is_err());
        assert_eq!(sim.boundary(), Boundary::new(1024.0, 768.0));
    }

    #[test]
    fn test_write_instances() {
        let mut sim = system(8);
        sim.add_impact(200.0, 200.0, ImpactKind::Asteroid);
        let mut out = Vec::new();
        sim.write_instances(&mut out);
        assert_eq!(out.len(), sim.active_count());
        assert!(out.iter().all(|i| i.radius == 4.0));
    }

    #[test]
    fn test_fast_particle_does_not_widen_pair_queries() {
        let mut sim = system(256);
        for i in 0..200 {
            let x = 20.0 + (i % 20) as f32 * 38.0;
            let y = 20.0 + (i / 20) as f32 * 55.0;
            sim.add_particle(x, y, &still(1000.0)).unwrap();
        }
        let mut fast = still(1000.0);
        fast.velocity = Some(Vec2::new(600.0, 0.0));
        sim.add_particle(10.0, 580.0, &fast).unwrap();

        sim.tick(16.0);
        let stats = sim.last_tick_stats();
        assert_eq!(stats.simulated, 201);
        assert_eq!(stats.pair_checks, 0);
    }

    #[test]
    fn test_seam_pairs_resolved_once_each() {
        let mut sim = system(32);
        // Spectators so the root splits
        for i in 0..8 {
            sim.add_particle(60.0 + i as f32 * 40.0, 500.0, &still(1000.0)).unwrap();
        }
        // Six overlapping pairs across the x = 400 seam
        let mut pairs = Vec::new();
        for k in 0..6 {
            let y = 50.0 + k as f32 * 40.0;
            let mut a = still(1000.0);
            a.velocity = Some(Vec2::new(1.0, 0.0));
            let mut b = still(1000.0);
            b.velocity = Some(Vec2::new(-1.0, 0.0));
            let ha = sim.add_particle(398.0, y, &a).unwrap();
            let hb = sim.add_particle(402.0, y, &b).unwrap();
            pairs.push((ha, hb));
        }

        sim.tick(16.0);
        let stats = sim.last_tick_stats();
        assert_eq!(stats.pair_checks, 6);
        assert_eq!(stats.pair_hits, 6);
        for (ha, hb) in pairs {
            assert!(sim.particle(ha).unwrap().vel.x < 0.0);
            assert!(sim.particle(hb).unwrap().vel.x > 0.0);
        }
    }

    #[test]
    fn test_pairs_found_after_boundary_shrinks() {
        let mut sim = system(4);
        let mut a = still(1000.0);
        a.velocity = Some(Vec2::new(0.0, 1.0));
        let mut b = still(1000.0);
        b.velocity = Some(Vec2::new(0.0, -1.0));
        sim.add_particle(700.0, 100.0, &a).unwrap();
        sim.add_particle(700.0, 103.0, &b).unwrap();

        sim.set_boundary(400.0, 300.0).unwrap();
        sim.tick(16.0);
        assert_eq!(sim.last_tick_stats().pair_hits, 1);
    }

    #[test]
    fn test_oversized_particles_tick() {
        let mut sim = system(8);
        let opts = ParticleOptions {
            radius: 500.0,
            max_bounces: 100,
            ..still(1000.0)
        };
        for i in 0..5 {
            sim.add_particle(100.0 + i as f32 * 150.0, 300.0, &opts).unwrap();
        }
        sim.tick(16.0);
        assert_eq!(sim.active_count(), 5);
        assert_eq!(sim.tree.node_count(), 5);
    }

    #[test]
    fn test_overflowing_explosion_speed_rejected() {
        let mut sim = system(8);
        let opts = ExplosionOptions {
            count: 4,
            speed: 2.0e38,
            ..Default::default()
        };
        assert_eq!(sim.add_explosion(100.0, 100.0, &opts), 0);
        assert_eq!(sim.active_count(), 0);
    }
}
