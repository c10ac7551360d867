//! Error types
//!
//! All of these are recoverable. Emitters swallow `EmitError` so a full pool
//! never interrupts a frame; callers that add single particles get the
//! reason back.

use thiserror::Error;

/// Why a particle was not created
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EmitError {
    #[error("particle pool exhausted")]
    PoolExhausted,

    #[error("invalid particle radius: {0}")]
    InvalidRadius(f32),

    #[error("invalid particle mass: {0}")]
    InvalidMass(f32),

    #[error("invalid particle life: {0}ms")]
    InvalidLife(f32),

    #[error("invalid particle velocity: ({x}, {y})")]
    InvalidVelocity { x: f32, y: f32 },

    #[error("invalid spawn position: ({x}, {y})")]
    InvalidPosition { x: f32, y: f32 },
}

/// Rejected engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,

    #[error("pool capacity {0} is too large")]
    CapacityTooLarge(usize),

    #[error("invalid boundary: {width}x{height}")]
    InvalidBoundary { width: f32, height: f32 },
}

/// Settings load/save failure
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings json error: {0}")]
    Json(#[from] serde_json::Error),
}
