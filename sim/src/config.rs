//! Simulation configuration.
//!
//! Every tunable value the simulation reads lives in `SimConfig`: the fixed
//! timestep, the unit state machine constants, terrain generation parameters
//! and the per-kind unit profiles. The config is inserted into the ECS world
//! as a resource and can be loaded from JSON.
//!
//! Identical configs (including the terrain seed) and identical command
//! sequences produce identical snapshots.

use crate::components::UnitKind;
use crate::error::SimError;
use crate::terrain::GenerationMethod;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How walking units steer toward their target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// Straight line toward the target, ignoring obstacles.
    #[default]
    DirectSeek,
    /// Follow an A* route over the walkability grid.
    PathFollow,
}

/// Terrain generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub width: u32,
    pub length: u32,
    pub method: GenerationMethod,
    /// Seed for the generation RNG (the only source of randomness).
    pub seed: u64,
    /// Probability that a tile is an obstacle.
    pub obstacle_density: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 50,
            length: 50,
            method: GenerationMethod::Brownian { volatility: 0.5 },
            seed: 0,
            obstacle_density: 0.0,
        }
    }
}

/// Base statistics for one kind of unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    pub max_health: f32,
    /// Metres per second.
    pub move_speed: f32,
    /// Health removed per completed attack cycle.
    pub attack_power: f32,
    pub attack_range: f32,
    /// Attacks per second.
    pub attack_rate: f32,
    pub radius: f32,
}

impl UnitProfile {
    pub fn villager() -> Self {
        Self {
            max_health: 50.0,
            move_speed: 1.0,
            attack_power: 1.0,
            attack_range: 1.0,
            attack_rate: 1.0,
            radius: 0.25,
        }
    }

    pub fn warrior() -> Self {
        Self {
            max_health: 100.0,
            move_speed: 1.5,
            attack_power: 5.0,
            attack_range: 1.5,
            attack_rate: 1.0,
            radius: 0.3,
        }
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), SimError> {
        let positive = [
            ("max_health", self.max_health),
            ("move_speed", self.move_speed),
            ("attack_rate", self.attack_rate),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "{name}.{field} must be positive (got {value})"
                )));
            }
        }
        let non_negative = [
            ("attack_power", self.attack_power),
            ("attack_range", self.attack_range),
            ("radius", self.radius),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "{name}.{field} must be non-negative (got {value})"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the simulation.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed timestep in seconds (e.g., 1/30 = 0.0333 for 30 Hz).
    pub fixed_timestep: f32,
    /// Distance at which a unit walking to a non-enemy target has arrived
    /// (two unit radii plus a buffer).
    pub arrival_threshold: f32,
    pub movement_mode: MovementMode,
    /// Despawn units whose health reaches zero.
    pub remove_dead_units: bool,
    /// Upper bound on A* node expansions per search (`None` = unbounded).
    pub max_search_expansions: Option<usize>,
    pub terrain: TerrainConfig,
    pub unit_profiles: BTreeMap<UnitKind, UnitProfile>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let mut unit_profiles = BTreeMap::new();
        unit_profiles.insert(UnitKind::Villager, UnitProfile::villager());
        unit_profiles.insert(UnitKind::Warrior, UnitProfile::warrior());
        Self {
            fixed_timestep: 1.0 / 30.0, // 30 Hz
            arrival_threshold: 0.9,
            movement_mode: MovementMode::DirectSeek,
            remove_dead_units: true,
            max_search_expansions: None,
            terrain: TerrainConfig::default(),
            unit_profiles,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Profile for a unit kind, falling back to the built-in preset.
    pub fn profile(&self, kind: UnitKind) -> UnitProfile {
        self.unit_profiles
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_profile())
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "fixed_timestep must be positive (got {})",
                self.fixed_timestep
            )));
        }
        if !(self.arrival_threshold.is_finite() && self.arrival_threshold >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "arrival_threshold must be non-negative (got {})",
                self.arrival_threshold
            )));
        }
        if self.terrain.width == 0 || self.terrain.length == 0 {
            return Err(SimError::InvalidConfig(format!(
                "terrain must be at least 1x1 (got {}x{})",
                self.terrain.width, self.terrain.length
            )));
        }
        if !(0.0..=1.0).contains(&self.terrain.obstacle_density) {
            return Err(SimError::InvalidConfig(format!(
                "obstacle_density must lie in [0, 1] (got {})",
                self.terrain.obstacle_density
            )));
        }
        for (kind, profile) in &self.unit_profiles {
            profile.validate(&format!("{kind:?}"))?;
        }
        Ok(())
    }
}
