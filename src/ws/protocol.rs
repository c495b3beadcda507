//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::player::Modifiers;
use crate::game::powerup::{PowerUpId, PowerUpKind};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the arena
    Join {
        /// Requested display name
        #[serde(default)]
        nickname: Option<String>,
    },

    /// Directional key state; sanitized before it reaches the simulation
    KeyUpdate {
        #[serde(default)]
        keys: serde_json::Value,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave the arena
    Leave,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: Uuid,
        server_time: u64,
    },

    /// Confirmation of a successful join
    Joined {
        player: PlayerInfo,
        round_length: u32,
        ball_radius: f32,
        grid_size: f32,
    },

    /// Join rejected: this connection already has a player
    PlayerIdTaken,

    /// Key update received before joining
    NoPlayerObject,

    /// World state for one tick
    MapUpdate {
        snapshot: WorldSnapshot,
        /// Events that happened during this tick
        events: Vec<ArenaEvent>,
    },

    /// Sent to a player kicked for leaving the outer ring
    OutOfBounds,

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Player identity shared with clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
}

/// 2D point on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub name: String,
    pub pos: Position,
    pub vel: Position,
    pub in_play: bool,
    pub score: u32,
    pub modifiers: Modifiers,
}

/// Power-up state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpSnapshot {
    pub id: PowerUpId,
    pub pos: Position,
    pub kind: PowerUpKind,
}

/// Everything a client needs to draw one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Server tick number, monotonic across rounds
    pub tick: u64,
    /// Ticks into the current round
    pub elapsed_ticks: u32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub players: Vec<PlayerSnapshot>,
    pub power_ups: Vec<PowerUpSnapshot>,
}

/// Why a player was removed by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KickReason {
    OutOfBounds,
}

/// Discrete per-player events surfaced alongside a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ArenaEvent {
    PlayerConnected {
        id: Uuid,
        name: String,
    },

    /// Left the inner ring
    PlayerEliminated {
        id: Uuid,
        /// Points lost
        penalty: u32,
    },

    /// Re-entered the ring using a rescue grant
    PlayerRescued {
        id: Uuid,
    },

    PlayerKicked {
        id: Uuid,
        reason: KickReason,
    },

    PowerUpCollected {
        player_id: Uuid,
        power_up_id: PowerUpId,
        kind: PowerUpKind,
    },

    /// Round length reached; world reset
    RoundReset,
}
