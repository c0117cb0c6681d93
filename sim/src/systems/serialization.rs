//! Serialization utilities for simulation state.

use crate::world::GameState;

/// Serialize a snapshot to a JSON string.
pub fn snapshot_to_json_string(snapshot: &GameState) -> Result<String, serde_json::Error> {
    serde_json::to_string(snapshot)
}

/// Deserialize a snapshot from a JSON string.
pub fn snapshot_from_json_string(data: &str) -> Result<GameState, serde_json::Error> {
    serde_json::from_str(data)
}
