// Commands issued to units by the presentation side.
//
// A command names a set of units and a target (a ground position or another
// unit). Applying it only assigns `Target` on each named unit; stance changes
// are left to the per-tick state machine. `Work` and `Build` share the data
// contract of `Walk` for now: the unit heads to the given position or unit.
//
// Unknown unit ids never abort a batch. They are collected in the returned
// `CommandReport` and the remaining ids are still applied.

use crate::components::{TargetRef, UnitId};
use crate::error::SimError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Walk,
    Work,
    Attack,
    Build,
}

/// A player-issued command for a group of units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub unit_ids: Vec<UnitId>,
    /// Ground position `(x, z)` when the target is a map location.
    pub position: Option<(f32, f32)>,
    /// Target unit when the command is aimed at another unit.
    pub target_unit: Option<UnitId>,
}

impl Command {
    pub fn walk_to(unit_ids: impl Into<Vec<UnitId>>, x: f32, z: f32) -> Self {
        Self {
            kind: CommandKind::Walk,
            unit_ids: unit_ids.into(),
            position: Some((x, z)),
            target_unit: None,
        }
    }

    pub fn attack(unit_ids: impl Into<Vec<UnitId>>, target: UnitId) -> Self {
        Self {
            kind: CommandKind::Attack,
            unit_ids: unit_ids.into(),
            position: None,
            target_unit: Some(target),
        }
    }

    /// Target assigned to every unit in the batch. A target unit takes
    /// precedence over a position; a position must be finite.
    pub fn target_ref(&self) -> Result<TargetRef, SimError> {
        match (self.target_unit, self.position) {
            (Some(id), _) => Ok(TargetRef::Unit(id)),
            (None, Some((x, z))) if !(x.is_finite() && z.is_finite()) => {
                Err(SimError::NonFinitePosition { x, z })
            }
            (None, Some((x, z))) => Ok(TargetRef::Point { x, z }),
            (None, None) => Err(SimError::MissingTarget { kind: self.kind }),
        }
    }
}

/// Outcome of applying a command batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReport {
    /// Units whose target was updated, in ascending id order.
    pub applied: Vec<UnitId>,
    /// Ids that did not match any live unit.
    pub unknown: Vec<UnitId>,
}

impl CommandReport {
    pub fn is_complete(&self) -> bool {
        self.unknown.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_unit_takes_precedence() {
        let command = Command {
            kind: CommandKind::Work,
            unit_ids: vec![UnitId(1)],
            position: Some((2.0, 3.0)),
            target_unit: Some(UnitId(9)),
        };
        assert_eq!(command.target_ref().unwrap(), TargetRef::Unit(UnitId(9)));
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let command = Command {
            kind: CommandKind::Build,
            unit_ids: vec![UnitId(1)],
            position: None,
            target_unit: None,
        };
        assert!(matches!(
            command.target_ref(),
            Err(SimError::MissingTarget { kind: CommandKind::Build })
        ));
    }

    #[test]
    fn test_non_finite_position_is_rejected() {
        for (x, z) in [(f32::NAN, 3.0), (1.0, f32::INFINITY), (f32::NEG_INFINITY, 0.0)] {
            let command = Command::walk_to(vec![UnitId(0)], x, z);
            assert!(matches!(
                command.target_ref(),
                Err(SimError::NonFinitePosition { .. })
            ));
        }
    }

    #[test]
    fn test_command_json_shape() {
        let command = Command::walk_to(vec![UnitId(0), UnitId(2)], 4.0, 5.5);
        let json = serde_json::to_string(&command).unwrap();
        let restored: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, command);
        assert!(json.contains("\"Walk\""));
    }
}
