//! RTS Simulation Core
//!
//! A deterministic, fixed-timestep ECS simulation of units on a heightmap.
//! Uses `bevy_ecs` for the entity-component-system architecture.
//!
//! - `terrain`: heightmap generation, walkability grid and height queries
//! - `pathfinding`: eight-directional A* over the walkability grid
//! - `systems`: the per-tick unit state machine and damage resolution
//! - `api`: `SimWorld`, the authoritative tick loop and command intake

pub mod api;
pub mod command;
pub mod components;
pub mod config;
pub mod error;
pub mod pathfinding;
pub mod registry;
pub mod systems;
pub mod terrain;
pub mod world;

pub use api::SimWorld;
pub use command::{Command, CommandKind, CommandReport};
pub use components::*;
pub use config::{MovementMode, SimConfig, TerrainConfig, UnitProfile};
pub use error::{SimError, TerrainError};
pub use pathfinding::{find_path, find_path_bounded, GridPath};
pub use registry::{RegistryEntry, UnitRegistry};
pub use systems::*;
pub use terrain::{GenerationMethod, GridCell, Terrain, TerrainResource, TerrainSnapshot, TileKind};
pub use world::{GameState, UnitState};
