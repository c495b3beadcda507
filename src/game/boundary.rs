//! Ring boundary: elimination, scoring, rescue and out-of-bounds kicks
//!
//! Scoring convention: a player leaving the inner ring loses one point for
//! every *other* player that was in play at the start of the tick (never
//! more than their score), and every player still in play after the sweep
//! gains one point per player eliminated this tick.

use crate::config::ArenaConfig;
use crate::ws::protocol::{ArenaEvent, KickReason};

use super::geometry::ArenaGeometry;
use super::physics::{Body, PhysicsSystem};
use super::player::{PlayerId, PlayerRegistry};

/// What the boundary pass did this tick
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BoundaryOutcome {
    /// Players that left the inner ring
    pub eliminated: u32,
    /// Players removed for leaving the outer ring
    pub kicked: Vec<PlayerId>,
}

/// Run the boundary pass over every player
pub fn resolve(
    players: &mut PlayerRegistry,
    geometry: &ArenaGeometry,
    elapsed: u32,
    config: &ArenaConfig,
    events: &mut Vec<ArenaEvent>,
) -> BoundaryOutcome {
    let inner_r2 = (geometry.inner_radius(elapsed) + config.ball_radius).powi(2);
    let outer_r2 = (geometry.outer_radius(elapsed) + config.ball_radius).powi(2);

    let players_inside = players.in_play_count() as u32;
    // The evaluated player is never part of its own baseline
    let penalty_base = players_inside.saturating_sub(1);
    let wall = Body::wall(config.wall_weight);

    let mut outcome = BoundaryOutcome::default();

    for player in players.iter_mut() {
        let dist_sq = player.pos.length_squared();

        if player.in_play && dist_sq > inner_r2 {
            player.in_play = false;
            let penalty = player.score.min(penalty_base);
            debug_assert!(penalty <= player.score);
            player.score -= penalty;
            outcome.eliminated += 1;
            events.push(ArenaEvent::PlayerEliminated {
                id: player.id,
                penalty,
            });
        }

        if player.in_play {
            continue;
        }

        if dist_sq > outer_r2 {
            outcome.kicked.push(player.id);
            events.push(ArenaEvent::PlayerKicked {
                id: player.id,
                reason: KickReason::OutOfBounds,
            });
        } else if dist_sq < inner_r2 {
            if player.modifiers.rescue_ready(elapsed) {
                player.in_play = true;
                player.modifiers.rescue = false;
                player.modifiers.rescue_cooldown_tick = None;
                events.push(ArenaEvent::PlayerRescued { id: player.id });
            } else if let Some((vel, _)) = PhysicsSystem::elastic_response(&Body::of(player), &wall)
            {
                player.vel = vel;
            }
        }
    }

    for id in &outcome.kicked {
        players.remove(id);
    }

    if outcome.eliminated > 0 {
        for player in players.iter_mut().filter(|p| p.in_play) {
            player.score = player.score.saturating_add(outcome.eliminated);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use proptest::prelude::*;
    use uuid::Uuid;

    const ROUND: u32 = 1500;

    fn setup(positions: &[(Vec2, u32)]) -> (PlayerRegistry, Vec<PlayerId>) {
        let mut registry = PlayerRegistry::new();
        let mut ids = Vec::new();
        for (pos, score) in positions {
            let id = Uuid::new_v4();
            registry.add(id, "p".into(), *pos).unwrap();
            registry.get_mut(&id).unwrap().score = *score;
            ids.push(id);
        }
        (registry, ids)
    }

    fn run(registry: &mut PlayerRegistry, elapsed: u32) -> (BoundaryOutcome, Vec<ArenaEvent>) {
        let mut events = Vec::new();
        let outcome = resolve(
            registry,
            &ArenaGeometry::new(ROUND),
            elapsed,
            &ArenaConfig::default(),
            &mut events,
        );
        (outcome, events)
    }

    #[test]
    fn eliminated_player_pays_one_point_per_other_player() {
        // inner ring at t=0 is 1000 + 20
        let (mut registry, ids) = setup(&[
            (Vec2::new(1100.0, 0.0), 5),
            (Vec2::new(0.0, 0.0), 0),
            (Vec2::new(100.0, 0.0), 3),
        ]);

        let (outcome, events) = run(&mut registry, 0);

        assert_eq!(outcome.eliminated, 1);
        let loser = registry.get(&ids[0]).unwrap();
        assert!(!loser.in_play);
        assert_eq!(loser.score, 3);
        assert_eq!(registry.get(&ids[1]).unwrap().score, 1);
        assert_eq!(registry.get(&ids[2]).unwrap().score, 4);
        assert_eq!(
            events,
            vec![ArenaEvent::PlayerEliminated {
                id: ids[0],
                penalty: 2
            }]
        );
    }

    #[test]
    fn lone_player_loses_nothing() {
        let (mut registry, ids) = setup(&[(Vec2::new(1100.0, 0.0), 4)]);
        run(&mut registry, 0);
        let player = registry.get(&ids[0]).unwrap();
        assert!(!player.in_play);
        assert_eq!(player.score, 4);
    }

    #[test]
    fn penalty_is_floored_at_zero() {
        let (mut registry, ids) = setup(&[
            (Vec2::new(1100.0, 0.0), 1),
            (Vec2::ZERO, 0),
            (Vec2::new(50.0, 0.0), 0),
            (Vec2::new(-50.0, 0.0), 0),
        ]);
        run(&mut registry, 0);
        assert_eq!(registry.get(&ids[0]).unwrap().score, 0);
    }

    #[test]
    fn beyond_outer_ring_is_kicked_exactly_once() {
        let (mut registry, ids) = setup(&[(Vec2::new(2100.0, 0.0), 0), (Vec2::ZERO, 0)]);

        let (outcome, events) = run(&mut registry, 0);
        assert_eq!(outcome.kicked, vec![ids[0]]);
        assert!(registry.get(&ids[0]).is_none());
        let kicks = events
            .iter()
            .filter(|e| matches!(e, ArenaEvent::PlayerKicked { .. }))
            .count();
        assert_eq!(kicks, 1);

        let (outcome, events) = run(&mut registry, 0);
        assert!(outcome.kicked.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn falling_back_margin_is_left_alone() {
        let (mut registry, ids) = setup(&[(Vec2::new(1500.0, 0.0), 0)]);
        registry.get_mut(&ids[0]).unwrap().in_play = false;
        registry.get_mut(&ids[0]).unwrap().vel = Vec2::new(-3.0, 0.0);

        let (_, events) = run(&mut registry, 0);

        let player = registry.get(&ids[0]).unwrap();
        assert!(events.is_empty());
        assert_eq!(player.vel, Vec2::new(-3.0, 0.0));
    }

    #[test]
    fn re_entry_without_grant_bounces_back() {
        let (mut registry, ids) = setup(&[(Vec2::new(1000.0, 0.0), 0)]);
        {
            let player = registry.get_mut(&ids[0]).unwrap();
            player.in_play = false;
            player.vel = Vec2::new(-5.0, 0.0);
        }

        run(&mut registry, 0);

        let player = registry.get(&ids[0]).unwrap();
        assert!(!player.in_play);
        assert!(player.vel.x > 0.0);
    }

    #[test]
    fn rescue_grant_restores_play_once_cooldown_elapsed() {
        let (mut registry, ids) = setup(&[(Vec2::new(900.0, 0.0), 0)]);
        {
            let player = registry.get_mut(&ids[0]).unwrap();
            player.in_play = false;
            player.vel = Vec2::new(-5.0, 0.0);
            player.modifiers.rescue = true;
            player.modifiers.rescue_cooldown_tick = Some(100);
        }

        // Cooldown still running: bounced like anyone else
        run(&mut registry, 50);
        assert!(!registry.get(&ids[0]).unwrap().in_play);
        assert!(registry.get(&ids[0]).unwrap().modifiers.rescue);

        registry.get_mut(&ids[0]).unwrap().pos = Vec2::new(300.0, 0.0);
        let (_, events) = run(&mut registry, 100);

        let player = registry.get(&ids[0]).unwrap();
        assert!(player.in_play);
        assert!(!player.modifiers.rescue);
        assert_eq!(player.modifiers.rescue_cooldown_tick, None);
        assert_eq!(events, vec![ArenaEvent::PlayerRescued { id: ids[0] }]);
    }

    proptest! {
        #[test]
        fn scores_move_by_the_documented_amounts(
            entries in proptest::collection::vec((-2500.0f32..2500.0, -2500.0f32..2500.0, 0u32..10), 1..12),
            elapsed in 0u32..ROUND,
        ) {
            let positions: Vec<(Vec2, u32)> =
                entries.iter().map(|(x, y, s)| (Vec2::new(*x, *y), *s)).collect();
            let (mut registry, ids) = setup(&positions);
            let before: Vec<u32> = positions.iter().map(|(_, s)| *s).collect();
            let others = ids.len() as u32 - 1;

            let (outcome, _) = run(&mut registry, elapsed);

            for (id, prior) in ids.iter().zip(before) {
                if let Some(player) = registry.get(id) {
                    if player.in_play {
                        prop_assert_eq!(player.score, prior + outcome.eliminated);
                    } else {
                        prop_assert_eq!(player.score, prior - prior.min(others));
                    }
                }
            }
        }
    }
}
