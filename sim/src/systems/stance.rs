//! Unit state machine - the gather phase of each tick.
//!
//! Every unit is copied into a `UnitFrame` and advanced by `advance_unit`, a
//! pure function of the frame, the pre-tick `UnitRegistry` and the terrain.
//! A unit only ever rewrites its own frame; damage against other units is
//! returned as a `DamageIntent` and applied later by the resolution pass.
//! Because no step observes another step's output, the frames can be
//! evaluated in any order (in parallel with the `parallel` feature) and the
//! results are written back in ascending `UnitId` order.
//!
//! ## Transitions
//!
//! | from   | to     | when                                                  |
//! |--------|--------|-------------------------------------------------------|
//! | Idle   | Walk   | a target is set                                       |
//! | Walk   | Idle   | target cleared or gone, or a non-enemy target reached |
//! | Walk   | Attack | target is an enemy within attack range                |
//! | Attack | Idle   | target changed or gone, or the attack cycle completed |
//!
//! Reaching a non-enemy target also clears it.
//!
//! Whatever the stance, a unit is clamped to the map and snapped to the
//! terrain height at the end of its step.

use crate::components::*;
use crate::config::{MovementMode, SimConfig};
use crate::pathfinding::find_path_bounded;
use crate::registry::UnitRegistry;
use crate::systems::combat::{DamageIntent, PendingDamage};
use crate::systems::movement::{seek, settle_on_terrain, yaw_towards, DeltaTime, SimTick};
use crate::terrain::{Terrain, TerrainResource};
use bevy_ecs::prelude::*;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Slack for comparing accumulated tick time against attack periods.
const TIMING_EPSILON: f32 = 1e-4;

/// Copy of the unit state the state machine reads and rewrites.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFrame {
    pub id: UnitId,
    pub team: TeamId,
    pub stats: UnitStats,
    pub position: Position,
    pub orientation: Orientation,
    pub stance: Stance,
    pub target: Target,
    pub attack_cycle: AttackCycle,
    pub route: Route,
}

/// Shared read-only inputs of one tick.
pub struct StepContext<'a> {
    pub tick: u64,
    pub dt: f32,
    pub terrain: &'a Terrain,
    pub registry: &'a UnitRegistry,
    pub arrival_threshold: f32,
    pub movement_mode: MovementMode,
    pub max_search_expansions: Option<usize>,
}

/// Result of advancing one unit by one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitStep {
    pub frame: UnitFrame,
    pub damage: Option<DamageIntent>,
}

/// What a target resolves to this tick.
enum Resolution {
    Unset,
    /// A unit target that no longer exists or is dead.
    Stale,
    Found(Goal),
}

struct Goal {
    x: f32,
    z: f32,
    /// Set when the target is a unit on another team.
    enemy: Option<UnitId>,
}

fn resolve_target(unit: &UnitFrame, registry: &UnitRegistry) -> Resolution {
    match unit.target.0 {
        None => Resolution::Unset,
        Some(TargetRef::Point { x, z }) => Resolution::Found(Goal { x, z, enemy: None }),
        Some(TargetRef::Unit(id)) => match registry.get_alive(id) {
            None => Resolution::Stale,
            Some(entry) => Resolution::Found(Goal {
                x: entry.position.x,
                z: entry.position.z,
                enemy: (entry.team != unit.team).then_some(id),
            }),
        },
    }
}

/// Advance one unit by one tick.
pub fn advance_unit(unit: &UnitFrame, ctx: &StepContext) -> UnitStep {
    let mut next = unit.clone();
    let mut damage = None;

    match unit.stance {
        Stance::Idle => {
            if unit.target.is_set() {
                next.stance = Stance::Walk;
            }
        }
        Stance::Walk => walk(&mut next, ctx),
        Stance::Attack => damage = attack(&mut next, ctx),
    }

    next.position = settle_on_terrain(ctx.terrain, next.position, unit.stats.radius);

    if next.stance != unit.stance {
        log::debug!(
            "unit {} {:?} -> {:?} at tick {}",
            unit.id.0,
            unit.stance,
            next.stance,
            ctx.tick
        );
    }

    UnitStep { frame: next, damage }
}

fn stop_walking(unit: &mut UnitFrame, clear_target: bool) {
    if clear_target {
        unit.target = Target::default();
    }
    unit.route.clear();
    unit.stance = Stance::Idle;
}

fn walk(unit: &mut UnitFrame, ctx: &StepContext) {
    let goal = match resolve_target(unit, ctx.registry) {
        Resolution::Unset => return stop_walking(unit, false),
        Resolution::Stale => return stop_walking(unit, true),
        Resolution::Found(goal) => goal,
    };

    let dist = unit.position.planar_distance_to(goal.x, goal.z);
    if goal.enemy.is_some() {
        if dist <= unit.stats.attack_range {
            unit.route.clear();
            unit.stance = Stance::Attack;
            return;
        }
    } else if dist < ctx.arrival_threshold {
        return stop_walking(unit, true);
    }

    let (wx, wz) = match ctx.movement_mode {
        MovementMode::DirectSeek => (goal.x, goal.z),
        MovementMode::PathFollow => match next_waypoint(unit, &goal, ctx) {
            Some(waypoint) => waypoint,
            None => {
                log::warn!(
                    "unit {} has no route to ({:.2}, {:.2}); dropping target",
                    unit.id.0,
                    goal.x,
                    goal.z
                );
                return stop_walking(unit, true);
            }
        },
    };

    let step = seek(
        unit.position.x,
        unit.position.z,
        wx,
        wz,
        unit.stats.move_speed * ctx.dt,
    );
    unit.position.x = step.x;
    unit.position.z = step.z;
    if let Some(yaw) = step.yaw {
        unit.orientation.yaw = yaw;
    }
    if step.reached && ctx.movement_mode == MovementMode::PathFollow {
        unit.route.waypoints.pop_front();
    }
}

/// Next point to steer at in path-following mode, replanning the route when
/// the goal cell changed. `None` when the goal cell is unreachable.
fn next_waypoint(unit: &mut UnitFrame, goal: &Goal, ctx: &StepContext) -> Option<(f32, f32)> {
    let goal_cell = ctx.terrain.cell_at(goal.x, goal.z);
    if !unit.route.is_planned_for(goal_cell) {
        unit.route.clear();
        let start = ctx.terrain.cell_at(unit.position.x, unit.position.z);
        let path = find_path_bounded(ctx.terrain, start, goal_cell, ctx.max_search_expansions)?;
        // Intermediate cell centres only: the goal cell is steered at directly.
        let inner = path.cells.len().saturating_sub(2);
        unit.route.waypoints = path.cells.iter().skip(1).take(inner).map(|c| c.center()).collect();
        unit.route.goal = Some(goal_cell);
        log::debug!(
            "unit {} planned {} steps to {:?} (cost {:.2})",
            unit.id.0,
            path.steps(),
            goal_cell,
            path.total_cost
        );
    }
    Some(unit.route.waypoints.front().copied().unwrap_or((goal.x, goal.z)))
}

fn end_attack(unit: &mut UnitFrame) {
    unit.attack_cycle = AttackCycle::default();
    unit.stance = Stance::Idle;
}

fn face(unit: &mut UnitFrame, goal: &Goal) {
    if let Some(yaw) = yaw_towards(goal.x - unit.position.x, goal.z - unit.position.z) {
        unit.orientation.yaw = yaw;
    }
}

/// One attack cycle. After the hit the unit passes through Idle and Walk
/// again before the next cycle starts, so a full cycle takes the attack
/// period plus three ticks.
fn attack(unit: &mut UnitFrame, ctx: &StepContext) -> Option<DamageIntent> {
    let goal = match resolve_target(unit, ctx.registry) {
        Resolution::Unset => {
            end_attack(unit);
            return None;
        }
        Resolution::Stale => {
            unit.target = Target::default();
            end_attack(unit);
            return None;
        }
        Resolution::Found(goal) => goal,
    };
    let Some(enemy) = goal.enemy else {
        end_attack(unit);
        return None;
    };

    match unit.attack_cycle.0 {
        None => {
            unit.attack_cycle.0 = Some(ActiveAttack {
                attackee: enemy,
                start_tick: ctx.tick,
            });
            face(unit, &goal);
            None
        }
        Some(cycle) if cycle.attackee != enemy => {
            end_attack(unit);
            None
        }
        Some(cycle) => {
            face(unit, &goal);
            let elapsed = ctx.tick.saturating_sub(cycle.start_tick) as f32 * ctx.dt;
            if elapsed + TIMING_EPSILON >= unit.stats.attack_period() {
                end_attack(unit);
                Some(DamageIntent {
                    attacker: Some(unit.id),
                    target: enemy,
                    amount: unit.stats.attack_power,
                })
            } else {
                None
            }
        }
    }
}

/// System running the state machine for every living unit.
///
/// ## Data Access
/// - Reads: SimTick, DeltaTime, SimConfig, TerrainResource, UnitRegistry
/// - Writes: Position, Orientation, Stance, Target, AttackCycle, Route, PendingDamage
#[allow(clippy::type_complexity)]
pub fn stance_system(
    tick: Res<SimTick>,
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    terrain: Res<TerrainResource>,
    registry: Res<UnitRegistry>,
    mut pending: ResMut<PendingDamage>,
    mut query: Query<(
        Entity,
        &UnitId,
        &TeamId,
        &UnitStats,
        &Health,
        &mut Position,
        &mut Orientation,
        &mut Stance,
        &mut Target,
        &mut AttackCycle,
        &mut Route,
    )>,
) {
    let ctx = StepContext {
        tick: tick.0,
        dt: dt.0,
        terrain: &terrain.0,
        registry: &registry,
        arrival_threshold: config.arrival_threshold,
        movement_mode: config.movement_mode,
        max_search_expansions: config.max_search_expansions,
    };

    let mut frames: Vec<(Entity, UnitFrame)> = query
        .iter()
        .filter(|(_, _, _, _, health, ..)| health.is_alive())
        .map(|(entity, id, team, stats, _, pos, orientation, stance, target, cycle, route)| {
            (
                entity,
                UnitFrame {
                    id: *id,
                    team: *team,
                    stats: *stats,
                    position: *pos,
                    orientation: *orientation,
                    stance: *stance,
                    target: *target,
                    attack_cycle: *cycle,
                    route: route.clone(),
                },
            )
        })
        .collect();
    frames.sort_by_key(|(_, frame)| frame.id);

    #[cfg(feature = "parallel")]
    let steps: Vec<(Entity, UnitStep)> = frames
        .par_iter()
        .map(|(entity, frame)| (*entity, advance_unit(frame, &ctx)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let steps: Vec<(Entity, UnitStep)> = frames
        .iter()
        .map(|(entity, frame)| (*entity, advance_unit(frame, &ctx)))
        .collect();

    for (entity, step) in steps {
        if let Some(intent) = step.damage {
            pending.push(intent);
        }
        if let Ok((.., mut pos, mut orientation, mut stance, mut target, mut cycle, mut route)) =
            query.get_mut(entity)
        {
            let frame = step.frame;
            *pos = frame.position;
            *orientation = frame.orientation;
            *stance = frame.stance;
            *target = frame.target;
            *cycle = frame.attack_cycle;
            *route = frame.route;
        }
    }
}
