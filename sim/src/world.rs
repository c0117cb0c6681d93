//! Published game state.
//!
//! A `GameState` is rebuilt from the ECS world after every tick and shared
//! with readers as an `Arc<GameState>`. Units are keyed by `UnitId` in a
//! `BTreeMap`, so the serialized form is stable across runs.

use crate::components::*;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of a single unit's state for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Yaw in degrees.
    pub orientation: f32,
    pub stance: Stance,
    pub team: TeamId,
    pub kind: UnitKind,
    pub health: f32,
    pub health_max: f32,
}

/// Complete simulation state at the end of a tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Last completed tick (0 before the first tick).
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub units: BTreeMap<UnitId, UnitState>,
}

impl GameState {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut query = world.query::<(
            &UnitId,
            &TeamId,
            &UnitKind,
            &Position,
            &Orientation,
            &Stance,
            &Health,
        )>();

        let units = query
            .iter(world)
            .map(|(id, team, kind, pos, orientation, stance, health)| {
                (
                    *id,
                    UnitState {
                        x: pos.x,
                        y: pos.y,
                        z: pos.z,
                        orientation: orientation.yaw,
                        stance: *stance,
                        team: *team,
                        kind: *kind,
                        health: health.current,
                        health_max: health.max,
                    },
                )
            })
            .collect();

        Self { tick, time, units }
    }

    pub fn unit(&self, id: UnitId) -> Option<&UnitState> {
        self.units.get(&id)
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
