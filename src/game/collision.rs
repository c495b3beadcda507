//! Player-player contact detection (sweep-and-prune on x) and response

use super::physics::{Body, PhysicsSystem};
use super::player::{Player, PlayerRegistry};

/// Exact overlap test for two avatars of radius `r`.
/// Callers have already pruned on x.
pub fn touching(a: &Player, b: &Player, r: f32) -> bool {
    if a.pos.y + r < b.pos.y - r || a.pos.y - r > b.pos.y + r {
        return false;
    }
    a.pos.distance_squared(b.pos) < (r + r) * (r + r)
}

/// Resolve every touching pair of in-play players.
/// Returns the number of pairs whose velocities changed.
pub fn resolve_collisions(players: &mut PlayerRegistry, ball_radius: f32, pinball_factor: f32) -> usize {
    let slice = players.as_mut_slice();

    let mut order: Vec<usize> = (0..slice.len()).filter(|&i| slice[i].in_play).collect();
    order.sort_by(|&a, &b| slice[a].pos.x.total_cmp(&slice[b].pos.x));

    let reach = ball_radius * 2.0;
    let mut resolved = 0;

    for n in 0..order.len() {
        let i = order[n];
        let x_limit = slice[i].pos.x + reach;
        for &j in &order[n + 1..] {
            if slice[j].pos.x > x_limit {
                break;
            }
            if !touching(&slice[i], &slice[j], ball_radius) {
                continue;
            }
            let (a, b) = pair_mut(slice, i, j);
            if let Some((va, vb)) = PhysicsSystem::elastic_response(&Body::of(a), &Body::of(b)) {
                let (va, vb) = PhysicsSystem::apply_pinball(va, vb, pinball_factor);
                a.vel = va;
                b.vel = vb;
                resolved += 1;
            }
        }
    }

    resolved
}

/// Two distinct mutable elements of one slice
fn pair_mut(slice: &mut [Player], i: usize, j: usize) -> (&mut Player, &mut Player) {
    debug_assert_ne!(i, j);
    if i < j {
        let (head, tail) = slice.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = slice.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use uuid::Uuid;

    fn registry_with(bodies: &[(Vec2, Vec2)]) -> (PlayerRegistry, Vec<Uuid>) {
        let mut registry = PlayerRegistry::new();
        let mut ids = Vec::new();
        for (pos, vel) in bodies {
            let id = Uuid::new_v4();
            registry.add(id, "p".into(), *pos).unwrap();
            registry.get_mut(&id).unwrap().vel = *vel;
            ids.push(id);
        }
        (registry, ids)
    }

    #[test]
    fn head_on_pair_swaps_velocities() {
        // Centres 39.9 apart: just inside touching distance of 40
        let (mut registry, ids) = registry_with(&[
            (Vec2::new(19.95, 0.0), Vec2::new(-5.0, 0.0)),
            (Vec2::new(-19.95, 0.0), Vec2::new(5.0, 0.0)),
        ]);

        assert_eq!(resolve_collisions(&mut registry, 20.0, 1.0), 1);

        let right = registry.get(&ids[0]).unwrap();
        let left = registry.get(&ids[1]).unwrap();
        assert!((right.vel - Vec2::new(5.0, 0.0)).length() < 1e-4);
        assert!((left.vel - Vec2::new(-5.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn heavier_player_is_deflected_less() {
        let (mut registry, ids) = registry_with(&[
            (Vec2::new(-19.0, 0.0), Vec2::new(5.0, 0.0)),
            (Vec2::new(19.0, 0.0), Vec2::new(-5.0, 0.0)),
        ]);
        registry.get_mut(&ids[0]).unwrap().modifiers.weight = 1.5;
        registry.get_mut(&ids[1]).unwrap().modifiers.weight = 0.7;

        resolve_collisions(&mut registry, 20.0, 1.0);

        let heavy = registry.get(&ids[0]).unwrap().vel;
        let light = registry.get(&ids[1]).unwrap().vel;
        assert!(light.x > heavy.x.abs());
        let momentum = heavy.x * 1.5 + light.x * 0.7;
        assert!((momentum - (5.0 * 1.5 - 5.0 * 0.7)).abs() < 1e-4);
    }

    #[test]
    fn pairs_out_of_reach_are_skipped() {
        let (mut registry, _) = registry_with(&[
            (Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0)),
            (Vec2::new(41.0, 0.0), Vec2::new(-5.0, 0.0)),
            (Vec2::new(0.0, 41.0), Vec2::new(0.0, -5.0)),
        ]);
        assert_eq!(resolve_collisions(&mut registry, 20.0, 1.0), 0);
    }

    #[test]
    fn out_of_play_players_do_not_collide() {
        let (mut registry, ids) = registry_with(&[
            (Vec2::new(-19.0, 0.0), Vec2::new(5.0, 0.0)),
            (Vec2::new(19.0, 0.0), Vec2::new(-5.0, 0.0)),
        ]);
        registry.get_mut(&ids[1]).unwrap().in_play = false;

        assert_eq!(resolve_collisions(&mut registry, 20.0, 1.0), 0);
        assert_eq!(registry.get(&ids[0]).unwrap().vel, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn diagonal_contact_is_found_across_sorted_order() {
        let (mut registry, _) = registry_with(&[
            (Vec2::new(100.0, 0.0), Vec2::ZERO),
            (Vec2::new(10.0, 10.0), Vec2::new(-3.0, -3.0)),
            (Vec2::new(-10.0, -10.0), Vec2::new(3.0, 3.0)),
        ]);
        assert_eq!(resolve_collisions(&mut registry, 20.0, 1.0), 1);
    }

    #[test]
    fn pinball_factor_speeds_up_the_slower_party() {
        let (mut registry, ids) = registry_with(&[
            (Vec2::new(-19.0, 0.0), Vec2::new(6.0, 0.0)),
            (Vec2::new(19.0, 0.0), Vec2::ZERO),
        ]);
        registry.get_mut(&ids[0]).unwrap().modifiers.weight = 0.7;
        registry.get_mut(&ids[1]).unwrap().modifiers.weight = 1.5;

        resolve_collisions(&mut registry, 20.0, 1.5);

        // Light striker rebounds at 6 * (1 - 3.0 / 2.2), then gets the boost
        let striker = registry.get(&ids[0]).unwrap().vel;
        let target = registry.get(&ids[1]).unwrap().vel;
        let rebound = 6.0 * (1.0 - 3.0 / 2.2) * 1.5;
        assert!((striker.x - rebound).abs() < 1e-3);
        assert!((target.x - 6.0 * 1.4 / 2.2).abs() < 1e-3);
    }
}
