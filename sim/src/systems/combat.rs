//! Combat resolution - the apply phase of each tick.
//!
//! The state machine never touches another unit's `Health`. Completed attack
//! cycles produce `DamageIntent`s in `PendingDamage`, and this module applies
//! them once every unit has been stepped.
//!
//! ## Ordering
//!
//! Intents are applied in the order they were queued: externally queued
//! damage first (see `SimWorld::queue_damage`), then unit attacks in
//! ascending attacker id. Damage is additive and clamped at zero, so the
//! final health does not depend on that order; only the log does.
//!
//! Targets resolve through the pre-tick `UnitRegistry`, so a unit that dies
//! in this tick still absorbs every intent aimed at it.

use crate::components::*;
use crate::config::SimConfig;
use crate::registry::UnitRegistry;
use crate::systems::movement::SimTick;
use bevy_ecs::prelude::*;

/// Damage to apply to one unit during resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageIntent {
    /// Unit whose attack produced the damage; `None` for external damage.
    pub attacker: Option<UnitId>,
    pub target: UnitId,
    pub amount: f32,
}

/// Intents collected for the current tick. Drained by
/// `damage_resolution_system`.
#[derive(Resource, Debug, Default)]
pub struct PendingDamage(pub Vec<DamageIntent>);

impl PendingDamage {
    pub fn push(&mut self, intent: DamageIntent) {
        self.0.push(intent);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DamageIntent> {
        self.0.iter()
    }
}

/// Apply every pending intent to its target's `Health`.
///
/// ## Data Access
/// - Reads: SimTick, UnitRegistry
/// - Writes: PendingDamage (drained), Health
pub fn damage_resolution_system(
    tick: Res<SimTick>,
    registry: Res<UnitRegistry>,
    mut pending: ResMut<PendingDamage>,
    mut query: Query<&mut Health>,
) {
    for intent in pending.0.drain(..) {
        let Some(entity) = registry.entity(intent.target) else {
            log::debug!(
                "tick {}: dropping {:.1} damage for unknown unit {}",
                tick.0,
                intent.amount,
                intent.target.0
            );
            continue;
        };
        let Ok(mut health) = query.get_mut(entity) else {
            continue;
        };
        health.apply_damage(intent.amount);
        match intent.attacker {
            Some(attacker) => log::debug!(
                "tick {}: unit {} hit unit {} for {:.1} ({:.1}/{:.1})",
                tick.0,
                attacker.0,
                intent.target.0,
                intent.amount,
                health.current,
                health.max
            ),
            None => log::debug!(
                "tick {}: unit {} took {:.1} damage ({:.1}/{:.1})",
                tick.0,
                intent.target.0,
                intent.amount,
                health.current,
                health.max
            ),
        }
    }
}

/// Despawn units whose health reached zero, when the config asks for it.
/// Otherwise dead units stay in the world and are skipped by the state
/// machine.
pub fn death_policy_system(
    mut commands: Commands,
    tick: Res<SimTick>,
    config: Res<SimConfig>,
    query: Query<(Entity, &UnitId, &Health)>,
) {
    if !config.remove_dead_units {
        return;
    }
    for (entity, id, health) in query.iter() {
        if !health.is_alive() {
            log::info!("tick {}: unit {} died", tick.0, id.0);
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::registry_update_system;

    fn world_with_units(config: SimConfig) -> World {
        let mut world = World::new();
        world.insert_resource(SimTick(1));
        world.insert_resource(config);
        world.insert_resource(UnitRegistry::new());
        world.insert_resource(PendingDamage::default());
        for (id, team) in [(0, 0), (1, 1)] {
            world.spawn((UnitId(id), TeamId(team), Position::default(), Health::new(10.0)));
        }
        world
    }

    fn resolve(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (registry_update_system, damage_resolution_system, death_policy_system).chain(),
        );
        schedule.run(world);
    }

    fn health_of(world: &mut World, id: UnitId) -> Option<Health> {
        world
            .query::<(&UnitId, &Health)>()
            .iter(world)
            .find(|(uid, _)| **uid == id)
            .map(|(_, h)| *h)
    }

    #[test]
    fn test_intents_accumulate_on_target() {
        let mut world = world_with_units(SimConfig::default());
        {
            let mut pending = world.resource_mut::<PendingDamage>();
            pending.push(DamageIntent {
                attacker: Some(UnitId(0)),
                target: UnitId(1),
                amount: 3.0,
            });
            pending.push(DamageIntent { attacker: None, target: UnitId(1), amount: 2.5 });
            pending.push(DamageIntent { attacker: None, target: UnitId(9), amount: 1.0 });
        }
        resolve(&mut world);

        assert_eq!(health_of(&mut world, UnitId(1)).unwrap().current, 4.5);
        assert_eq!(health_of(&mut world, UnitId(0)).unwrap().current, 10.0);
        assert!(world.resource::<PendingDamage>().is_empty());
    }

    #[test]
    fn test_dead_units_despawn_when_configured() {
        let mut world = world_with_units(SimConfig::default());
        world.resource_mut::<PendingDamage>().push(DamageIntent {
            attacker: Some(UnitId(0)),
            target: UnitId(1),
            amount: 25.0,
        });
        resolve(&mut world);
        assert!(health_of(&mut world, UnitId(1)).is_none());
    }

    #[test]
    fn test_dead_units_kept_when_configured() {
        let config = SimConfig {
            remove_dead_units: false,
            ..SimConfig::default()
        };
        let mut world = world_with_units(config);
        world.resource_mut::<PendingDamage>().push(DamageIntent {
            attacker: Some(UnitId(0)),
            target: UnitId(1),
            amount: 25.0,
        });
        resolve(&mut world);
        let health = health_of(&mut world, UnitId(1)).unwrap();
        assert_eq!(health.current, 0.0);
        assert!(!health.is_alive());
    }
}
