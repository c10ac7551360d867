//! Particle quality settings and preferences
//!
//! Persisted as JSON. The quality preset decides pool size, effect density
//! and which physics stages run; `QualityGovernor` moves between presets
//! based on measured frame rate.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SettingsError;

/// Quality preset levels, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 4] = [
        QualityPreset::Low,
        QualityPreset::Medium,
        QualityPreset::High,
        QualityPreset::Ultra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
            QualityPreset::Ultra => "Ultra",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            "ultra" => Some(QualityPreset::Ultra),
            _ => None,
        }
    }

    /// Pool capacity for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 200,
            QualityPreset::Medium => 500,
            QualityPreset::High => 1000,
            QualityPreset::Ultra => 2000,
        }
    }

    /// Whether gravity, friction and gravity wells run
    pub fn particle_physics(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }

    /// Whether particle-particle collisions run
    pub fn particle_collisions(&self) -> bool {
        matches!(self, QualityPreset::High | QualityPreset::Ultra)
    }

    /// Multiplier applied to effect particle counts
    pub fn particle_density(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.4,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 0.8,
            QualityPreset::Ultra => 1.0,
        }
    }

    /// Whether renderers should stretch fast particles along their velocity
    pub fn motion_blur(&self) -> bool {
        matches!(self, QualityPreset::High | QualityPreset::Ultra)
    }

    /// Next preset down, if any
    pub fn lower(&self) -> Option<Self> {
        match self {
            QualityPreset::Low => None,
            QualityPreset::Medium => Some(QualityPreset::Low),
            QualityPreset::High => Some(QualityPreset::Medium),
            QualityPreset::Ultra => Some(QualityPreset::High),
        }
    }

    /// Next preset up, if any
    pub fn higher(&self) -> Option<Self> {
        match self {
            QualityPreset::Low => Some(QualityPreset::Medium),
            QualityPreset::Medium => Some(QualityPreset::High),
            QualityPreset::High => Some(QualityPreset::Ultra),
            QualityPreset::Ultra => None,
        }
    }

    /// Starting preset for a device
    pub fn recommend(device: &DeviceProfile) -> Self {
        match device.gpu {
            GpuTier::High if device.memory_gb > 4.0 && device.pixel_ratio >= 2.0 => QualityPreset::Ultra,
            GpuTier::Medium if device.memory_gb > 2.0 => QualityPreset::High,
            GpuTier::Low => QualityPreset::Medium,
            _ if device.memory_gb < 2.0 => QualityPreset::Medium,
            _ => QualityPreset::Low,
        }
    }
}

/// Coarse GPU class reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuTier {
    Low,
    Medium,
    High,
}

/// Host hardware summary used to pick a starting preset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub gpu: GpuTier,
    pub memory_gb: f32,
    pub pixel_ratio: f32,
}

/// Physics tuning, normalized to a 16 ms frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration per normalized tick
    pub gravity: f32,
    /// Velocity multiplier per normalized tick
    pub friction: f32,
    /// Bounciness for walls and particle pairs
    pub restitution: f32,
    /// Gravity, friction and gravity wells
    pub physics_enabled: bool,
    /// Pairwise particle collisions
    pub collisions_enabled: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            friction: FRICTION,
            restitution: RESTITUTION,
            physics_enabled: true,
            collisions_enabled: true,
        }
    }
}

impl PhysicsConfig {
    /// Defaults with the stage toggles of a preset
    pub fn for_preset(preset: QualityPreset) -> Self {
        Self {
            physics_enabled: preset.particle_physics(),
            collisions_enabled: preset.particle_collisions(),
            ..Self::default()
        }
    }
}

/// Particle preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Current quality preset
    pub quality: QualityPreset,
    /// Let the governor change the preset from measured FPS
    pub auto_adjust: bool,
    /// Frame rate below which quality is lowered
    pub fps_threshold: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::High,
            auto_adjust: true,
            fps_threshold: 45.0,
        }
    }
}

impl Settings {
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        self.quality.max_particles()
    }

    pub fn physics(&self) -> PhysicsConfig {
        PhysicsConfig::for_preset(self.quality)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file, falling back to defaults on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path)
            .map_err(SettingsError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(settings) => {
                log::info!("Loaded particle settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Failed to load particle settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Particle settings saved to {}", path.display());
        Ok(())
    }
}

/// One FPS measurement from the governor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsSample {
    pub fps: f32,
    /// New preset if the governor changed quality
    pub changed_to: Option<QualityPreset>,
}

/// Frame-rate driven quality controller
#[derive(Debug, Clone)]
pub struct QualityGovernor {
    settings: Settings,
    frames: u32,
    window_start_ms: f64,
}

impl QualityGovernor {
    /// Sampling window
    pub const WINDOW_MS: f64 = 1000.0;
    /// FPS above threshold + headroom raises quality
    pub const HEADROOM_FPS: f32 = 15.0;

    pub fn new(settings: Settings, now_ms: f64) -> Self {
        Self {
            settings,
            frames: 0,
            window_start_ms: now_ms,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn quality(&self) -> QualityPreset {
        self.settings.quality
    }

    pub fn set_quality(&mut self, preset: QualityPreset) {
        self.settings.quality = preset;
    }

    pub fn set_auto_adjust(&mut self, enabled: bool) {
        self.settings.auto_adjust = enabled;
    }

    pub fn set_fps_threshold(&mut self, fps: f32) {
        self.settings.fps_threshold = fps;
    }

    /// Count a frame; returns a sample once per window
    pub fn record_frame(&mut self, now_ms: f64) -> Option<FpsSample> {
        self.frames += 1;
        let elapsed = now_ms - self.window_start_ms;
        if elapsed < Self::WINDOW_MS {
            return None;
        }

        let fps = (self.frames as f64 * 1000.0 / elapsed) as f32;
        self.frames = 0;
        self.window_start_ms = now_ms;

        let changed_to = if self.settings.auto_adjust {
            self.adjust(fps)
        } else {
            None
        };
        Some(FpsSample { fps, changed_to })
    }

    fn adjust(&mut self, fps: f32) -> Option<QualityPreset> {
        let current = self.settings.quality;
        let next = if fps < self.settings.fps_threshold {
            current.lower()
        } else if fps > self.settings.fps_threshold + Self::HEADROOM_FPS {
            current.higher()
        } else {
            None
        }?;
        log::info!(
            "Particle quality {} -> {} ({:.1} fps)",
            current.as_str(),
            next.as_str(),
            fps
        );
        self.settings.quality = next;
        Some(next)
    }
}
