//! Read-only registry of every unit, keyed by `UnitId`.
//!
//! Rebuilt at the start of each tick so the state machine can resolve
//! unit targets (position, team, liveness) without borrowing other units'
//! components while it writes its own. All reads during a tick see the
//! pre-tick state, which keeps the per-unit step order-independent.

use crate::components::*;
use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

/// Registry entry for one unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryEntry {
    pub entity: Entity,
    pub team: TeamId,
    pub position: Position,
    pub alive: bool,
}

#[derive(Resource, Debug, Default)]
pub struct UnitRegistry {
    entries: BTreeMap<UnitId, RegistryEntry>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all entries (call before rebuilding).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn insert(&mut self, id: UnitId, entry: RegistryEntry) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: UnitId) -> Option<&RegistryEntry> {
        self.entries.get(&id)
    }

    /// Entry for a unit that exists and still has health.
    pub fn get_alive(&self, id: UnitId) -> Option<&RegistryEntry> {
        self.entries.get(&id).filter(|e| e.alive)
    }

    pub fn entity(&self, id: UnitId) -> Option<Entity> {
        self.entries.get(&id).map(|e| e.entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &RegistryEntry)> {
        self.entries.iter()
    }
}

/// System that rebuilds the unit registry from current unit components.
pub fn registry_update_system(
    mut registry: ResMut<UnitRegistry>,
    query: Query<(Entity, &UnitId, &TeamId, &Position, &Health)>,
) {
    registry.clear();
    for (entity, id, team, pos, health) in query.iter() {
        registry.insert(
            *id,
            RegistryEntry {
                entity,
                team: *team,
                position: *pos,
                alive: health.is_alive(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_tracks_units() {
        let mut world = World::new();
        world.insert_resource(UnitRegistry::new());
        world.spawn((UnitId(3), TeamId(1), Position::new(1.0, 0.0, 2.0), Health::new(10.0)));
        world.spawn((
            UnitId(1),
            TeamId(2),
            Position::default(),
            Health { current: 0.0, max: 10.0 },
        ));

        let mut schedule = Schedule::default();
        schedule.add_systems(registry_update_system);
        schedule.run(&mut world);

        let registry = world.resource::<UnitRegistry>();
        assert_eq!(registry.len(), 2);
        let ids: Vec<u32> = registry.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(registry.get_alive(UnitId(3)).is_some());
        assert!(registry.get(UnitId(1)).is_some());
        assert!(registry.get_alive(UnitId(1)).is_none());
        assert_eq!(registry.get(UnitId(3)).unwrap().team, TeamId(1));
    }
}
