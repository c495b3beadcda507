//! Snapshot building

use crate::ws::protocol::{PlayerSnapshot, PowerUpSnapshot, WorldSnapshot};

use super::geometry::ArenaGeometry;
use super::player::PlayerRegistry;
use super::powerup::PowerUpManager;

/// Builds the per-tick world snapshot for broadcast
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    /// Snapshots built since the arena started
    built: u64,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots built so far
    #[cfg(test)]
    pub fn built(&self) -> u64 {
        self.built
    }

    /// Capture the externally visible state of this tick
    pub fn build(
        &mut self,
        elapsed: u32,
        geometry: &ArenaGeometry,
        players: &PlayerRegistry,
        power_ups: &PowerUpManager,
    ) -> WorldSnapshot {
        self.built += 1;

        let players = players
            .iter()
            .map(|p| PlayerSnapshot {
                id: p.id,
                name: p.name.clone(),
                pos: p.pos.into(),
                vel: p.vel.into(),
                in_play: p.in_play,
                score: p.score,
                modifiers: p.modifiers,
            })
            .collect();

        let power_ups = power_ups
            .iter()
            .map(|p| PowerUpSnapshot {
                id: p.id,
                pos: p.pos.into(),
                kind: p.kind,
            })
            .collect();

        WorldSnapshot {
            tick: self.built,
            elapsed_ticks: elapsed,
            inner_radius: geometry.inner_radius(elapsed),
            outer_radius: geometry.outer_radius(elapsed),
            players,
            power_ups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::powerup::PowerUpKind;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    #[test]
    fn snapshot_mirrors_world() {
        let geometry = ArenaGeometry::new(1500);
        let mut players = PlayerRegistry::new();
        let id = Uuid::new_v4();
        players.add(id, "ann".into(), Vec2::new(3.0, 4.0)).unwrap();
        players.get_mut(&id).unwrap().score = 7;

        let mut power_ups = PowerUpManager::new(20, 200);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        power_ups.spawn(&mut rng, PowerUpKind::Rescue, &geometry, 30);

        let mut builder = SnapshotBuilder::new();
        let snapshot = builder.build(30, &geometry, &players, &power_ups);

        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.elapsed_ticks, 30);
        assert_eq!(snapshot.inner_radius, geometry.inner_radius(30));
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].name, "ann");
        assert_eq!(snapshot.players[0].score, 7);
        assert_eq!(snapshot.players[0].pos.x, 3.0);
        assert_eq!(snapshot.power_ups.len(), power_ups.len());

        let next = builder.build(31, &geometry, &players, &power_ups);
        assert_eq!(next.tick, 2);
    }

    #[test]
    fn snapshot_uses_snake_case_keys() {
        let geometry = ArenaGeometry::new(100);
        let mut builder = SnapshotBuilder::new();
        let snapshot = builder.build(0, &geometry, &PlayerRegistry::new(), &PowerUpManager::new(20, 200));
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["elapsed_ticks"], 0);
        assert!(json["players"].as_array().unwrap().is_empty());
        assert!(json["power_ups"].as_array().unwrap().is_empty());
    }
}
