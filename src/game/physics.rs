//! Player movement and elastic bounce math

use glam::Vec2;

use crate::config::ArenaConfig;

use super::player::Player;

/// Point mass used by the bounce solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    pub mass: f32,
}

impl Body {
    pub fn of(player: &Player) -> Self {
        Self {
            pos: player.pos,
            vel: player.vel,
            mass: player.modifiers.weight,
        }
    }

    /// Immovable stand-in for the arena wall, sitting at the origin
    pub fn wall(mass: f32) -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            mass,
        }
    }
}

/// Physics system for updating player velocities and positions
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance one player by a tick: accelerate, damp, clamp, move
    pub fn integrate(player: &mut Player, config: &ArenaConfig) {
        let accel = config.acceleration * player.modifiers.accel;
        let mut vel = player.vel + player.input.direction() * accel;

        vel *= config.friction;

        let max_speed = config.max_speed * player.modifiers.speed;
        vel = vel.clamp(Vec2::splat(-max_speed), Vec2::splat(max_speed));

        player.vel = vel;
        player.pos += vel;
    }

    /// Integrate every tracked player, in play or not
    pub fn integrate_all<'a>(players: impl Iterator<Item = &'a mut Player>, config: &ArenaConfig) {
        for player in players {
            Self::integrate(player, config);
        }
    }

    /// Elastic response along the line joining the two centres.
    /// Returns the new velocities, or None when the bodies are separating.
    pub fn elastic_response(a: &Body, b: &Body) -> Option<(Vec2, Vec2)> {
        let separation = a.pos - b.pos;
        let dist_sq = separation.length_squared();
        if dist_sq <= f32::EPSILON {
            return None;
        }

        let relative = b.vel - a.vel;
        let dot = separation.dot(relative);
        if dot <= 0.0 {
            return None;
        }

        let along = separation * (dot / dist_sq);
        let total = a.mass + b.mass;
        let weight_a = 2.0 * b.mass / total;
        let weight_b = 2.0 * a.mass / total;

        Some((a.vel + along * weight_a, b.vel - along * weight_b))
    }

    /// Boost the slower of two post-collision velocities
    pub fn apply_pinball(va: Vec2, vb: Vec2, factor: f32) -> (Vec2, Vec2) {
        if factor == 1.0 {
            return (va, vb);
        }
        if va.length_squared() < vb.length_squared() {
            (va * factor, vb)
        } else {
            (va, vb * factor)
        }
    }
}
