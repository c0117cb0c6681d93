//! ECS Systems for the unit simulation.
//!
//! Systems contain the game logic that operates on components.
//!
//! ## Tick Order
//!
//! One fixed tick runs these systems as a single chain:
//!
//! 1. `registry_update_system` - rebuilds the `UnitRegistry` from the
//!    pre-tick unit components.
//! 2. `stance_system` - the gather phase. Advances every living unit's state
//!    machine from its own data plus the registry, moving and re-facing it,
//!    and queues `DamageIntent`s for completed attack cycles.
//! 3. `damage_resolution_system` - the apply phase. Applies queued damage
//!    sequentially in queue order.
//! 4. `death_policy_system` - despawns dead units when
//!    `SimConfig::remove_dead_units` is set.

pub mod combat;
pub mod movement;
pub mod serialization;
pub mod stance;

pub use combat::*;
pub use movement::*;
pub use serialization::*;
pub use stance::*;
