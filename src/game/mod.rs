//! Game simulation modules

pub mod arena;
pub mod boundary;
pub mod collision;
pub mod geometry;
pub mod physics;
pub mod player;
pub mod powerup;
pub mod round;
pub mod snapshot;

pub use arena::{ArenaHandle, GameArena};
pub use player::{JoinError, PlayerId};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Directional key state for a single player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFlags {
    pub left: bool,
    pub up: bool,
    pub right: bool,
    pub down: bool,
}

impl InputFlags {
    /// Read the four flags out of an untrusted JSON payload.
    /// Anything that is not a JSON `true` counts as released.
    pub fn from_json(value: &Value) -> Self {
        let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
        Self {
            left: flag("left"),
            up: flag("up"),
            right: flag("right"),
            down: flag("down"),
        }
    }

    /// Per-axis unit push; up is negative y
    pub fn direction(&self) -> Vec2 {
        let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
        Vec2::new(axis(self.left, self.right), axis(self.up, self.down))
    }
}
