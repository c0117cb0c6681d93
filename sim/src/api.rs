//! Public API for the simulation.
//!
//! `SimWorld` is the single writer of simulation state. Presentation code
//! submits `Command`s, advances time with `tick` or `step`, and reads the
//! latest published `GameState`.
//!
//! ## Fixed Timestep
//!
//! Every tick advances the simulation by `SimConfig::fixed_timestep`. When
//! `step(dt)` is called, the simulation accumulates time and runs as many
//! fixed updates as fit. Results depend only on the config, the terrain and
//! the command sequence, never on frame rate.
//!
//! ## Snapshots
//!
//! The snapshot is rebuilt after every tick and every spawn and handed out as
//! an `Arc<GameState>`. Readers keep whichever version they hold; the next
//! publish replaces the pointer without touching it.

use crate::command::{Command, CommandReport};
use crate::components::*;
use crate::config::{SimConfig, UnitProfile};
use crate::error::SimError;
use crate::registry::{registry_update_system, UnitRegistry};
use crate::systems::*;
use crate::terrain::{Terrain, TerrainResource, TerrainSnapshot};
use crate::world::GameState;
use bevy_ecs::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Initializing the simulation
/// - Spawning units and issuing commands
/// - Stepping the simulation forward
/// - Extracting state snapshots
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    terrain: Arc<Terrain>,
    next_id: u32,
    snapshot: Arc<GameState>,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl SimWorld {
    /// Validate the config, generate terrain from its seed and build the
    /// tick schedule.
    pub fn initialize(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let params = &config.terrain;
        let mut rng = Pcg32::seed_from_u64(params.seed);
        let mut terrain = Terrain::generate(params.width, params.length, params.method, &mut rng)?;
        let obstacles = terrain.scatter_obstacles(params.obstacle_density, &mut rng)?;
        log::info!(
            "generated {}x{} terrain ({:?}, seed {}, {} obstacles)",
            params.width,
            params.length,
            params.method,
            params.seed,
            obstacles
        );
        Self::with_terrain(config, terrain)
    }

    /// Build a simulation over prebuilt terrain. `config.terrain` is ignored.
    pub fn with_terrain(config: SimConfig, terrain: Terrain) -> Result<Self, SimError> {
        config.validate()?;
        let terrain = Arc::new(terrain);
        let mut world = World::new();

        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(SimTick(0));
        world.insert_resource(TerrainResource(Arc::clone(&terrain)));
        world.insert_resource(UnitRegistry::new());
        world.insert_resource(PendingDamage::default());
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                registry_update_system,
                stance_system,
                damage_resolution_system,
                death_policy_system,
            )
                .chain(),
        );

        log::info!(
            "simulation ready on {}x{} terrain",
            terrain.width(),
            terrain.length()
        );

        Ok(Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
            terrain,
            next_id: 0,
            snapshot: Arc::new(GameState::default()),
            time_accumulator: 0.0,
        })
    }

    fn fixed_timestep(&self) -> f32 {
        self.world
            .get_resource::<SimConfig>()
            .map(|c| c.fixed_timestep)
            .unwrap_or(1.0 / 30.0)
    }

    /// Spawn a unit with the configured profile for its kind.
    pub fn spawn_unit(
        &mut self,
        kind: UnitKind,
        team: TeamId,
        x: f32,
        z: f32,
    ) -> Result<UnitId, SimError> {
        let profile = self
            .world
            .get_resource::<SimConfig>()
            .map(|c| c.profile(kind))
            .unwrap_or_else(|| kind.default_profile());
        self.spawn_unit_with_profile(kind, team, profile, x, z)
    }

    /// Spawn a unit with explicit stats. The position must lie on the
    /// terrain; it is then inset by the unit radius and snapped to the surface.
    /// The cell it ends up in must be walkable.
    pub fn spawn_unit_with_profile(
        &mut self,
        kind: UnitKind,
        team: TeamId,
        profile: UnitProfile,
        x: f32,
        z: f32,
    ) -> Result<UnitId, SimError> {
        profile.validate(&format!("{kind:?}"))?;
        self.terrain.height_at(x, z)?;
        let position = settle_on_terrain(&self.terrain, Position::new(x, 0.0, z), profile.radius);
        let cell = self.terrain.cell_at(position.x, position.z);
        if !self.terrain.is_walkable(cell) {
            return Err(SimError::BlockedSpawn { x: cell.x, z: cell.z });
        }

        let id = UnitId(self.next_id);
        self.next_id += 1;
        self.world.spawn(UnitBundle::new(id, team, kind, profile, position));
        log::info!(
            "spawned {:?} {} for team {} at ({:.2}, {:.2}, {:.2})",
            kind,
            id.0,
            team.0,
            position.x,
            position.y,
            position.z
        );

        self.publish();
        Ok(id)
    }

    /// Living units by id.
    fn live_units(&mut self) -> BTreeMap<UnitId, Entity> {
        let mut query = self.world.query::<(Entity, &UnitId, &Health)>();
        query
            .iter(&self.world)
            .filter(|(_, _, health)| health.is_alive())
            .map(|(entity, id, _)| (*id, entity))
            .collect()
    }

    fn assign_target(&mut self, unit_ids: &[UnitId], target: Target) -> CommandReport {
        let mut ids = unit_ids.to_vec();
        ids.sort();
        ids.dedup();

        let live = self.live_units();
        let mut report = CommandReport::default();
        for id in ids {
            match live.get(&id) {
                Some(&entity) => {
                    if let Some(mut current) = self.world.get_mut::<Target>(entity) {
                        *current = target;
                    }
                    report.applied.push(id);
                }
                None => {
                    log::warn!("command names unknown unit {}", id.0);
                    report.unknown.push(id);
                }
            }
        }
        report
    }

    /// Apply a player command. Only `Target` changes here; stances follow on
    /// the next tick.
    pub fn submit_command(&mut self, command: &Command) -> Result<CommandReport, SimError> {
        let target = Target(Some(command.target_ref()?));
        let report = self.assign_target(&command.unit_ids, target);
        log::debug!(
            "{:?} command applied to {} units ({} unknown)",
            command.kind,
            report.applied.len(),
            report.unknown.len()
        );
        Ok(report)
    }

    /// Drop the target of each named unit.
    pub fn clear_target(&mut self, unit_ids: &[UnitId]) -> CommandReport {
        self.assign_target(unit_ids, Target::default())
    }

    /// Queue damage against a unit, applied during the next tick's resolution
    /// pass ahead of any unit attacks.
    pub fn queue_damage(&mut self, target: UnitId, amount: f32) -> Result<(), SimError> {
        if !self.live_units().contains_key(&target) {
            return Err(SimError::UnknownUnit(target));
        }
        if let Some(mut pending) = self.world.get_resource_mut::<PendingDamage>() {
            pending.push(DamageIntent {
                attacker: None,
                target,
                amount,
            });
        }
        Ok(())
    }

    /// Run exactly one fixed tick.
    pub fn tick(&mut self) {
        let dt = self.fixed_timestep();
        self.fixed_update(dt);
    }

    /// Step the simulation forward by `dt` seconds. Returns the number of
    /// fixed ticks that ran.
    pub fn step(&mut self, dt: f32) -> usize {
        if !(dt.is_finite() && dt >= 0.0) {
            log::warn!("ignoring step with invalid dt {dt}");
            return 0;
        }
        let fixed_dt = self.fixed_timestep();

        self.time_accumulator += dt;

        let mut ticks = 0;
        while self.time_accumulator >= fixed_dt {
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
            ticks += 1;
        }
        ticks
    }

    /// Run a single fixed timestep update.
    fn fixed_update(&mut self, dt: f32) {
        if let Some(mut dt_res) = self.world.get_resource_mut::<DeltaTime>() {
            dt_res.0 = dt;
        }
        if let Some(mut tick_res) = self.world.get_resource_mut::<SimTick>() {
            tick_res.increment();
        }

        self.schedule.run(&mut self.world);

        self.tick += 1;
        self.time += dt;
        self.publish();
    }

    fn publish(&mut self) {
        self.snapshot = Arc::new(GameState::from_world(&mut self.world, self.tick, self.time));
    }

    /// Latest published state.
    pub fn snapshot(&self) -> Arc<GameState> {
        Arc::clone(&self.snapshot)
    }

    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        snapshot_to_json_string(&self.snapshot)
    }

    /// Full terrain for the initial presentation load.
    pub fn terrain_snapshot(&self) -> TerrainSnapshot {
        TerrainSnapshot::from_terrain(&self.terrain)
    }

    pub fn terrain_snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.terrain_snapshot())
    }

    /// Current state-machine view of one unit (including its target and
    /// attack cycle, which the snapshot does not carry).
    pub fn unit(&mut self, id: UnitId) -> Option<UnitFrame> {
        let mut query = self.world.query::<(
            &UnitId,
            &TeamId,
            &UnitStats,
            &Position,
            &Orientation,
            &Stance,
            &Target,
            &AttackCycle,
            &Route,
        )>();
        query
            .iter(&self.world)
            .find(|(uid, ..)| **uid == id)
            .map(|(id, team, stats, pos, orientation, stance, target, cycle, route)| UnitFrame {
                id: *id,
                team: *team,
                stats: *stats,
                position: *pos,
                orientation: *orientation,
                stance: *stance,
                target: *target,
                attack_cycle: *cycle,
                route: route.clone(),
            })
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn config(&self) -> Option<&SimConfig> {
        self.world.get_resource::<SimConfig>()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
