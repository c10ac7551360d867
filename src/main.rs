//! Particle Engine demo entry point
//!
//! Runs a headless simulation loop paced to 16 ms wall-clock frames and logs
//! what the pool is doing. The quality governor samples real frame times.
//! Pass a settings JSON path as the first argument to load quality
//! preferences.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    use particle_engine::consts::BASELINE_FRAME_MS;
    use particle_engine::sim::{Emission, ExplosionOptions, ImpactKind, colors};
    use particle_engine::{ParticleSystem, QualityGovernor, Settings};

    env_logger::init();
    log::info!("Particle Engine (native) starting...");

    let settings = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => Settings::load(&path),
        None => Settings::default(),
    };

    let (width, height) = (1280.0, 720.0);
    let mut sim = match ParticleSystem::with_settings(&settings, width, height, 0x5eed) {
        Ok(sim) => sim,
        Err(e) => {
            log::error!("Failed to create particle system: {}", e);
            std::process::exit(1);
        }
    };
    let started = Instant::now();
    let elapsed_ms = || started.elapsed().as_secs_f64() * 1000.0;
    let mut governor = QualityGovernor::new(settings, elapsed_ms());

    sim.add_emission(width / 2.0, height / 2.0, &Emission::spiral());

    const FRAMES: u32 = 300;
    let frame_budget = Duration::from_millis(BASELINE_FRAME_MS as u64);
    let mut last_frame = Instant::now();
    for frame in 0..FRAMES {
        let frame_start = Instant::now();
        let delta_ms = frame_start.duration_since(last_frame).as_secs_f32() * 1000.0;
        last_frame = frame_start;

        if frame % 30 == 0 {
            let x = 200.0 + (frame as f32 * 37.0) % (width - 400.0);
            let opts = ExplosionOptions {
                count: 40,
                color: colors::WHITE,
                ..Default::default()
            };
            sim.add_explosion(x, height / 3.0, &opts);
        }
        if frame % 45 == 0 {
            sim.add_impact(width / 3.0, height / 2.0, ImpactKind::Asteroid);
        }
        sim.add_gravity_well(width / 2.0, height / 2.0, 0.05, 150.0);

        sim.tick(if frame == 0 { BASELINE_FRAME_MS } else { delta_ms });

        if let Some(sample) = governor.record_frame(elapsed_ms()) {
            log::debug!("{:.1} fps at {}", sample.fps, governor.quality().as_str());
            if let Some(preset) = sample.changed_to {
                if let Err(e) = sim.apply_quality(preset) {
                    log::warn!("Could not apply quality {}: {}", preset.as_str(), e);
                }
            }
        }

        if frame % 60 == 0 {
            let stats = sim.last_tick_stats();
            log::info!(
                "frame {:>4}: {:>4}/{} active, {} wall hits, {}/{} pair hits, {} released",
                frame,
                sim.active_count(),
                sim.capacity(),
                stats.wall_hits,
                stats.pair_hits,
                stats.pair_checks,
                stats.released
            );
        }

        // Pace to a ~60 Hz frame; slow ticks eat into the budget and lower FPS
        let spent = frame_start.elapsed();
        if spent < frame_budget {
            std::thread::sleep(frame_budget - spent);
        }
    }

    let mut fastest = 0.0f32;
    sim.for_each_active_particle(|p| fastest = fastest.max(p.vel.length()));
    println!(
        "Simulated {} frames ({:.1}s): {} particles alive, fastest {:.2} px/tick",
        FRAMES,
        sim.clock_ms() / 1000.0,
        sim.active_count(),
        fastest
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The host page drives `ParticleSystem::tick` from its animation frame callback
}
