//! Player state and the registry that owns it

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::InputFlags;

/// Connection id assigned by the transport
pub type PlayerId = Uuid;

/// Longest accepted display name, in characters
pub const MAX_NAME_CHARS: usize = 12;
/// Name used when none is supplied
pub const DEFAULT_NAME: &str = "player";

/// Share of the grid (centered square side) used for join placement
const SPAWN_AREA_FRACTION: f32 = 0.35;

/// Attribute multipliers granted by power-ups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub speed: f32,
    pub weight: f32,
    pub accel: f32,
    /// Holds an unused rescue grant
    pub rescue: bool,
    /// Round tick from which the rescue grant can be used
    pub rescue_cooldown_tick: Option<u32>,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            speed: 1.0,
            weight: 1.0,
            accel: 1.0,
            rescue: false,
            rescue_cooldown_tick: None,
        }
    }
}

impl Modifiers {
    /// Whether the rescue grant may be spent at `elapsed`
    pub fn rescue_ready(&self, elapsed: u32) -> bool {
        self.rescue && self.rescue_cooldown_tick.map_or(true, |tick| tick <= elapsed)
    }
}

/// Player state in the arena (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,

    // Position and movement
    pub pos: Vec2,
    pub vel: Vec2,
    pub input: InputFlags,

    pub modifiers: Modifiers,
    pub in_play: bool,
    pub score: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: String, pos: Vec2) -> Self {
        Self {
            id,
            name,
            pos,
            vel: Vec2::ZERO,
            input: InputFlags::default(),
            modifiers: Modifiers::default(),
            in_play: true,
            score: 0,
        }
    }

    /// Back to the start-of-round state; score and position are kept
    pub fn reset_for_round(&mut self) {
        self.in_play = true;
        self.modifiers = Modifiers::default();
    }
}

/// Trim a requested display name to the accepted form
pub fn sanitize_name(requested: Option<&str>) -> String {
    match requested {
        Some(name) if !name.is_empty() => name.chars().take(MAX_NAME_CHARS).collect(),
        _ => DEFAULT_NAME.to_string(),
    }
}

/// Join rejections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Player id already has a live player")]
    DuplicateId,

    #[error("Arena is not accepting commands")]
    ArenaClosed,
}

/// Owns every connected player
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Vec<Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.iter().any(|p| p.id == *id)
    }

    #[cfg(test)]
    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    /// Contiguous view for index-based passes such as sweep-and-prune
    pub fn as_mut_slice(&mut self) -> &mut [Player] {
        &mut self.players
    }

    /// Count players currently in play
    pub fn in_play_count(&self) -> usize {
        self.players.iter().filter(|p| p.in_play).count()
    }

    /// Insert a new player with default state
    pub fn add(&mut self, id: PlayerId, name: String, pos: Vec2) -> Result<&Player, JoinError> {
        if self.contains(&id) {
            return Err(JoinError::DuplicateId);
        }
        self.players.push(Player::new(id, name, pos));
        Ok(&self.players[self.players.len() - 1])
    }

    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.id == *id)?;
        Some(self.players.remove(idx))
    }

    /// Replace a player's directional flags; false if the id is unknown
    pub fn set_input(&mut self, id: &PlayerId, input: InputFlags) -> bool {
        match self.get_mut(id) {
            Some(player) => {
                player.input = input;
                true
            }
            None => false,
        }
    }

    /// Pick a spawn point whose bounding box avoids every other player.
    /// Falls back to the center when all attempts collide.
    pub fn free_position<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        grid_size: f32,
        ball_radius: f32,
        attempts: u32,
    ) -> Vec2 {
        let range = grid_size * SPAWN_AREA_FRACTION;
        let min_gap = ball_radius * 2.0;

        for _ in 0..attempts {
            let candidate = Vec2::new(
                (rng.gen::<f32>() - 0.5) * range,
                (rng.gen::<f32>() - 0.5) * range,
            );
            let blocked = self.players.iter().any(|p| {
                (p.pos.x - candidate.x).abs() < min_gap && (p.pos.y - candidate.y).abs() < min_gap
            });
            if !blocked {
                return candidate;
            }
        }
        Vec2::ZERO
    }
}
