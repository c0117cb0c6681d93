//! Movement helpers - steering, facing and terrain placement.

use crate::components::*;
use crate::terrain::Terrain;
use bevy_ecs::prelude::*;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// Global simulation tick counter. Incremented before each fixed update,
/// so the first tick processed is tick 1.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Yaw in degrees (`[0, 360)`) facing along `(dx, dz)`, `None` for a zero vector.
pub fn yaw_towards(dx: f32, dz: f32) -> Option<f32> {
    if dx * dx + dz * dz < 1e-12 {
        return None;
    }
    Some(dx.atan2(dz).to_degrees().rem_euclid(360.0))
}

/// Result of one steering step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekStep {
    pub x: f32,
    pub z: f32,
    /// Heading of the movement, `None` if already at the goal.
    pub yaw: Option<f32>,
    /// True when the goal was reached this step.
    pub reached: bool,
}

/// Move from `(x, z)` toward `(goal_x, goal_z)` by at most `max_step`,
/// never overshooting the goal.
pub fn seek(x: f32, z: f32, goal_x: f32, goal_z: f32, max_step: f32) -> SeekStep {
    let dx = goal_x - x;
    let dz = goal_z - z;
    let dist = (dx * dx + dz * dz).sqrt();
    let yaw = yaw_towards(dx, dz);
    if dist <= max_step {
        SeekStep {
            x: goal_x,
            z: goal_z,
            yaw,
            reached: true,
        }
    } else {
        SeekStep {
            x: x + dx / dist * max_step,
            z: z + dz / dist * max_step,
            yaw,
            reached: false,
        }
    }
}

/// Clamp a position into the map (inset by the unit radius) and snap its
/// height to the terrain surface.
pub fn settle_on_terrain(terrain: &Terrain, pos: Position, radius: f32) -> Position {
    let (x, z) = terrain.clamp_to_bounds(pos.x, pos.z, radius);
    let y = match terrain.height_at(x, z) {
        Ok(h) => h,
        Err(err) => {
            log::warn!("keeping previous height after clamped query failed: {err}");
            pos.y
        }
    };
    Position::new(x, y, z)
}
