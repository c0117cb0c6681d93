//! ECS Components for the unit simulation.
//!
//! Components are pure data containers attached to unit entities.
//! All game logic lives in systems that query these components.

use crate::config::UnitProfile;
use crate::terrain::GridCell;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// World position. `x`/`z` span the ground plane, `y` is terrain height.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Distance on the ground plane (height ignored).
    pub fn planar_distance_to(&self, x: f32, z: f32) -> f32 {
        let dx = x - self.x;
        let dz = z - self.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Heading around the vertical axis, in degrees within `[0, 360)`.
/// Zero faces +z, 90 faces +x.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub yaw: f32,
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Unique identifier for a unit, assigned in ascending spawn order.
#[derive(
    Component,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct UnitId(pub u32);

/// Team the unit belongs to. Units on different teams are enemies.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u16);

/// Unit archetype; selects the stat profile at spawn time.
#[derive(
    Component,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum UnitKind {
    #[default]
    Villager,
    Warrior,
}

impl UnitKind {
    pub fn default_profile(&self) -> UnitProfile {
        match self {
            UnitKind::Villager => UnitProfile::villager(),
            UnitKind::Warrior => UnitProfile::warrior(),
        }
    }
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Health of a unit.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Only called by the damage resolution pass.
    pub fn apply_damage(&mut self, amount: f32) {
        self.current = (self.current - amount).clamp(0.0, self.max);
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(50.0)
    }
}

/// Per-unit movement and attack statistics.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Metres per second.
    pub move_speed: f32,
    pub attack_power: f32,
    pub attack_range: f32,
    /// Attacks per second.
    pub attack_rate: f32,
    /// Collision radius; also the inset used when clamping to the map.
    pub radius: f32,
}

impl UnitStats {
    /// Seconds between the start of an attack cycle and its damage.
    pub fn attack_period(&self) -> f32 {
        1.0 / self.attack_rate
    }
}

impl From<UnitProfile> for UnitStats {
    fn from(profile: UnitProfile) -> Self {
        Self {
            move_speed: profile.move_speed,
            attack_power: profile.attack_power,
            attack_range: profile.attack_range,
            attack_rate: profile.attack_rate,
            radius: profile.radius,
        }
    }
}

impl Default for UnitStats {
    fn default() -> Self {
        UnitProfile::villager().into()
    }
}

// ============================================================================
// BEHAVIOUR COMPONENTS
// ============================================================================

/// Current behavioural state of a unit.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stance {
    #[default]
    Idle,
    Walk,
    Attack,
}

/// What a unit is heading toward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TargetRef {
    /// A point on the ground plane.
    Point { x: f32, z: f32 },
    /// Another unit, resolved through the unit registry each tick.
    Unit(UnitId),
}

/// Optional target; `None` keeps the unit idle.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Target(pub Option<TargetRef>);

impl Target {
    pub fn point(x: f32, z: f32) -> Self {
        Self(Some(TargetRef::Point { x, z }))
    }

    pub fn unit(id: UnitId) -> Self {
        Self(Some(TargetRef::Unit(id)))
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

/// Timed attack sub-state, only active while the stance is `Attack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAttack {
    pub attackee: UnitId,
    pub start_tick: u64,
}

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCycle(pub Option<ActiveAttack>);

/// Waypoints toward a target cell, used in path-following mode.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Cell the route was planned to; a different target cell forces a replan.
    pub goal: Option<GridCell>,
    /// Cell centres still to visit, nearest first.
    pub waypoints: VecDeque<(f32, f32)>,
}

impl Route {
    pub fn clear(&mut self) {
        self.goal = None;
        self.waypoints.clear();
    }

    pub fn is_planned_for(&self, cell: GridCell) -> bool {
        self.goal == Some(cell)
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete unit entity.
#[derive(Bundle, Default)]
pub struct UnitBundle {
    pub id: UnitId,
    pub team: TeamId,
    pub kind: UnitKind,
    pub position: Position,
    pub orientation: Orientation,
    pub health: Health,
    pub stats: UnitStats,
    pub stance: Stance,
    pub target: Target,
    pub attack_cycle: AttackCycle,
    pub route: Route,
}

impl UnitBundle {
    pub fn new(
        id: UnitId,
        team: TeamId,
        kind: UnitKind,
        profile: UnitProfile,
        position: Position,
    ) -> Self {
        Self {
            id,
            team,
            kind,
            position,
            orientation: Orientation::default(),
            health: Health::new(profile.max_health),
            stats: profile.into(),
            stance: Stance::Idle,
            target: Target::default(),
            attack_cycle: AttackCycle::default(),
            route: Route::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_clamps_at_zero() {
        let mut health = Health::new(10.0);
        health.apply_damage(4.0);
        assert_eq!(health.current, 6.0);
        health.apply_damage(100.0);
        assert_eq!(health.current, 0.0);
        assert!(!health.is_alive());
    }

    #[test]
    fn test_stats_from_profile() {
        let stats = UnitStats::from(UnitProfile::warrior());
        assert_eq!(stats.attack_power, 5.0);
        assert!((stats.attack_period() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_planar_distance_ignores_height() {
        let pos = Position::new(0.0, 10.0, 0.0);
        assert!((pos.planar_distance_to(3.0, 4.0) - 5.0).abs() < 1e-6);
    }
}
