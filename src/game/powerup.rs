//! Power-ups: pickup, effects and probabilistic spawning

use std::collections::HashSet;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ws::protocol::ArenaEvent;

use super::geometry::ArenaGeometry;
use super::player::{Modifiers, PlayerRegistry};

/// Stable identifier assigned at spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerUpId(pub u64);

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    SpeedUp,
    SpeedDown,
    WeightUp,
    WeightDown,
    AccelUp,
    /// One re-entry into the ring without bouncing
    Rescue,
}

/// Spawn slots; rescue occupies two so it is twice as likely as any other kind
const SPAWN_TABLE: [PowerUpKind; 7] = [
    PowerUpKind::SpeedUp,
    PowerUpKind::SpeedDown,
    PowerUpKind::WeightUp,
    PowerUpKind::WeightDown,
    PowerUpKind::AccelUp,
    PowerUpKind::Rescue,
    PowerUpKind::Rescue,
];

impl PowerUpKind {
    pub fn is_rescue(self) -> bool {
        self == Self::Rescue
    }

    /// Overwrite the matching modifier; effects never stack
    pub fn apply(self, modifiers: &mut Modifiers, elapsed: u32, rescue_cooldown_ticks: u32) {
        match self {
            Self::SpeedUp => modifiers.speed = 1.2,
            Self::SpeedDown => modifiers.speed = 0.8,
            Self::WeightUp => modifiers.weight = 1.5,
            Self::WeightDown => modifiers.weight = 0.7,
            Self::AccelUp => modifiers.accel = 1.5,
            Self::Rescue => {
                modifiers.rescue = true;
                modifiers.rescue_cooldown_tick = Some(elapsed.saturating_add(rescue_cooldown_ticks));
            }
        }
    }

    /// Uniform pick over the spawn table
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        SPAWN_TABLE[rng.gen_range(0..SPAWN_TABLE.len())]
    }
}

/// Active power-up in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub id: PowerUpId,
    pub pos: Vec2,
    pub kind: PowerUpKind,
}

/// Owns the active power-ups of the current round
#[derive(Debug)]
pub struct PowerUpManager {
    items: Vec<PowerUp>,
    next_id: u64,
    /// Every position handed out this round, as raw bits
    used_positions: HashSet<(u32, u32)>,
    spawn_attempts: u32,
    rescue_cooldown_ticks: u32,
}

impl PowerUpManager {
    pub fn new(spawn_attempts: u32, rescue_cooldown_ticks: u32) -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
            used_positions: HashSet::new(),
            spawn_attempts,
            rescue_cooldown_ticks,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PowerUp> {
        self.items.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every power-up and forget this round's positions
    pub fn clear(&mut self) {
        self.items.clear();
        self.used_positions.clear();
    }

    /// Hand each touched power-up to the first player touching it
    pub fn collect(
        &mut self,
        players: &mut PlayerRegistry,
        ball_radius: f32,
        elapsed: u32,
        events: &mut Vec<ArenaEvent>,
    ) -> usize {
        let before = self.items.len();
        let cooldown = self.rescue_cooldown_ticks;
        let radius_sq = ball_radius * ball_radius;

        for player in players.iter_mut() {
            if self.items.is_empty() {
                break;
            }
            self.items.retain(|power_up| {
                let d = player.pos - power_up.pos;
                if d.x.abs() > ball_radius || d.y.abs() > ball_radius {
                    return true;
                }
                if d.length_squared() >= radius_sq {
                    return true;
                }
                power_up.kind.apply(&mut player.modifiers, elapsed, cooldown);
                events.push(ArenaEvent::PowerUpCollected {
                    player_id: player.id,
                    power_up_id: power_up.id,
                    kind: power_up.kind,
                });
                false
            });
        }

        before - self.items.len()
    }

    /// Bernoulli spawn roll with probability players / round length
    pub fn maybe_spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        geometry: &ArenaGeometry,
        elapsed: u32,
        player_count: usize,
    ) -> Option<PowerUpId> {
        let probability = (player_count as f64 / geometry.round_length() as f64).min(1.0);
        if !rng.gen_bool(probability) {
            return None;
        }
        let kind = PowerUpKind::random(rng);
        self.spawn(rng, kind, geometry, elapsed)
    }

    /// Place a power-up of `kind`, or skip silently when sampling runs dry
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        kind: PowerUpKind,
        geometry: &ArenaGeometry,
        elapsed: u32,
    ) -> Option<PowerUpId> {
        let inner = geometry.inner_radius(elapsed);
        let outer = geometry.outer_radius(elapsed);
        let pos = self.sample_position(rng, kind, inner, outer)?;

        let id = PowerUpId(self.next_id);
        self.next_id += 1;
        self.used_positions.insert(position_key(pos));
        self.items.push(PowerUp { id, pos, kind });
        Some(id)
    }

    /// Rejection-sample a position: inside the inner ring for regular kinds,
    /// inside the inner/outer annulus for rescue
    fn sample_position<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        kind: PowerUpKind,
        inner: f32,
        outer: f32,
    ) -> Option<Vec2> {
        let half = if kind.is_rescue() { outer } else { inner };
        let inner_sq = inner * inner;
        let outer_sq = outer * outer;

        for _ in 0..self.spawn_attempts {
            let pos = Vec2::new(
                (rng.gen::<f32>() * 2.0 - 1.0) * half,
                (rng.gen::<f32>() * 2.0 - 1.0) * half,
            );
            let dist_sq = pos.length_squared();
            let fits = if kind.is_rescue() {
                dist_sq > inner_sq && dist_sq < outer_sq
            } else {
                dist_sq < inner_sq
            };
            if fits && !self.used_positions.contains(&position_key(pos)) {
                return Some(pos);
            }
        }
        None
    }
}

fn position_key(pos: Vec2) -> (u32, u32) {
    (pos.x.to_bits(), pos.y.to_bits())
}
