//! Error types for terrain construction, configuration and commands.
//!
//! Route search failure is not an error: `find_path` returns `None` and
//! callers treat a missing route as a normal outcome.

use crate::command::CommandKind;
use crate::components::UnitId;
use thiserror::Error;

/// Failures raised by terrain generation and terrain queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    #[error("terrain dimensions must be at least 1x1 (got {width}x{length})")]
    InvalidDimensions { width: u32, length: u32 },
    #[error("height query at ({x}, {z}) is outside the terrain")]
    OutOfBounds { x: f32, z: f32 },
    #[error("cell ({x}, {z}) is outside the terrain")]
    CellOutOfBounds { x: i32, z: i32 },
    #[error("uniform height range is empty (min {min} > max {max})")]
    InvalidRange { min: f32, max: f32 },
    #[error("volatility must be finite and non-negative (got {0})")]
    InvalidVolatility(f32),
    #[error("obstacle density must lie in [0, 1] (got {0})")]
    InvalidDensity(f32),
    #[error("{grid} grid has {actual} entries, expected {expected}")]
    GridMismatch {
        grid: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Top-level simulation error.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Terrain(#[from] TerrainError),
    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{kind:?} command has neither a target position nor a target unit")]
    MissingTarget { kind: CommandKind },
    #[error("target position ({x}, {z}) is not finite")]
    NonFinitePosition { x: f32, z: f32 },
    #[error("cannot spawn on blocked cell ({x}, {z})")]
    BlockedSpawn { x: i32, z: i32 },
    #[error("unknown unit {0:?}")]
    UnknownUnit(UnitId),
}
