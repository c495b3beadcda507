//! Arena state and authoritative tick loop

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::ArenaConfig;
use crate::util::time::TickSource;
use crate::ws::protocol::{ArenaEvent, KickReason, PlayerInfo, ServerMsg, WorldSnapshot};

use super::boundary;
use super::collision::resolve_collisions;
use super::geometry::ArenaGeometry;
use super::physics::PhysicsSystem;
use super::player::{sanitize_name, JoinError, Player, PlayerId, PlayerRegistry};
use super::powerup::PowerUpManager;
use super::round::{RoundState, RoundTick};
use super::snapshot::SnapshotBuilder;
use super::InputFlags;

/// Mutations queued by the transport, applied between ticks
#[derive(Debug)]
pub enum ArenaCommand {
    Join {
        id: PlayerId,
        nickname: Option<String>,
        /// Told directly when this player is kicked
        kick_tx: mpsc::Sender<KickReason>,
        reply: oneshot::Sender<Result<PlayerInfo, JoinError>>,
    },
    Input {
        id: PlayerId,
        keys: InputFlags,
    },
    Leave {
        id: PlayerId,
    },
}

/// Everything one tick produced
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub snapshot: WorldSnapshot,
    pub events: Vec<ArenaEvent>,
}

/// The simulated world (owned by the arena task)
pub struct ArenaState {
    pub config: ArenaConfig,
    pub geometry: ArenaGeometry,
    pub round: RoundState,
    pub players: PlayerRegistry,
    pub power_ups: PowerUpManager,
    pub rng: ChaCha8Rng,
    snapshot_builder: SnapshotBuilder,
    /// Events raised between ticks, flushed with the next snapshot
    pending_events: Vec<ArenaEvent>,
}

impl ArenaState {
    pub fn new(config: ArenaConfig, seed: u64) -> Self {
        Self {
            geometry: ArenaGeometry::new(config.round_length),
            round: RoundState::new(config.round_length),
            players: PlayerRegistry::new(),
            power_ups: PowerUpManager::new(config.spawn_attempts, config.rescue_cooldown_ticks),
            rng: ChaCha8Rng::seed_from_u64(seed),
            snapshot_builder: SnapshotBuilder::new(),
            pending_events: Vec::new(),
            config,
        }
    }

    /// Add a player at a free spot; starts the round when idle
    pub fn join(&mut self, id: PlayerId, nickname: Option<&str>) -> Result<PlayerInfo, JoinError> {
        if self.players.contains(&id) {
            return Err(JoinError::DuplicateId);
        }

        let pos = self.players.free_position(
            &mut self.rng,
            self.geometry.grid_size(),
            self.config.ball_radius,
            self.config.placement_attempts,
        );
        let player = self.players.add(id, sanitize_name(nickname), pos)?;
        let info = PlayerInfo {
            id: player.id,
            name: player.name.clone(),
        };

        self.pending_events.push(ArenaEvent::PlayerConnected {
            id: info.id,
            name: info.name.clone(),
        });

        if self.round.start() {
            self.power_ups.clear();
        }

        Ok(info)
    }

    /// Replace a player's key state; unknown ids are ignored
    pub fn set_input(&mut self, id: &PlayerId, keys: InputFlags) -> bool {
        self.players.set_input(id, keys)
    }

    /// Remove a player; the round stops once nobody is left
    pub fn leave(&mut self, id: &PlayerId) -> Option<Player> {
        let player = self.players.remove(id)?;
        if self.players.is_empty() {
            self.round.stop();
            self.pending_events.clear();
        }
        Some(player)
    }

    /// Run one simulation step
    pub fn step(&mut self) -> TickOutput {
        let mut events = std::mem::take(&mut self.pending_events);

        if self.round.advance() == RoundTick::Reset {
            self.reset_round();
            events.push(ArenaEvent::RoundReset);
        }
        let elapsed = self.round.elapsed();
        let ball_radius = self.config.ball_radius;

        PhysicsSystem::integrate_all(self.players.iter_mut(), &self.config);

        let boundary = boundary::resolve(
            &mut self.players,
            &self.geometry,
            elapsed,
            &self.config,
            &mut events,
        );
        if boundary.eliminated > 0 || !boundary.kicked.is_empty() {
            debug!(
                eliminated = boundary.eliminated,
                kicked = boundary.kicked.len(),
                "Boundary pass"
            );
        }

        resolve_collisions(&mut self.players, ball_radius, self.config.pinball_factor);

        self.power_ups
            .collect(&mut self.players, ball_radius, elapsed, &mut events);
        self.power_ups
            .maybe_spawn(&mut self.rng, &self.geometry, elapsed, self.players.len());

        // Kicks can empty the arena
        if self.players.is_empty() {
            self.round.stop();
        }

        let snapshot =
            self.snapshot_builder
                .build(elapsed, &self.geometry, &self.players, &self.power_ups);

        TickOutput { snapshot, events }
    }

    /// Bring everyone back into play with default modifiers
    fn reset_round(&mut self) {
        for player in self.players.iter_mut() {
            player.reset_for_round();
        }
        self.power_ups.clear();
    }
}

/// Handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    command_tx: mpsc::Sender<ArenaCommand>,
    update_tx: broadcast::Sender<ServerMsg>,
    player_count: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

impl ArenaHandle {
    /// Ask the arena to add a player. A kick is reported on `kick_tx`
    /// independently of the lossy update broadcast.
    pub async fn join(
        &self,
        id: PlayerId,
        nickname: Option<String>,
        kick_tx: mpsc::Sender<KickReason>,
    ) -> Result<PlayerInfo, JoinError> {
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(ArenaCommand::Join {
                id,
                nickname,
                kick_tx,
                reply,
            })
            .await
            .map_err(|_| JoinError::ArenaClosed)?;
        reply_rx.await.map_err(|_| JoinError::ArenaClosed)?
    }

    /// Forward sanitized key state; false if the arena is gone
    pub async fn input(&self, id: PlayerId, keys: InputFlags) -> bool {
        self.command_tx
            .send(ArenaCommand::Input { id, keys })
            .await
            .is_ok()
    }

    pub async fn leave(&self, id: PlayerId) {
        let _ = self.command_tx.send(ArenaCommand::Leave { id }).await;
    }

    /// Receive every tick's map update
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.update_tx.subscribe()
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// The authoritative arena task
pub struct GameArena<T: TickSource> {
    state: ArenaState,
    ticker: T,
    command_rx: mpsc::Receiver<ArenaCommand>,
    update_tx: broadcast::Sender<ServerMsg>,
    kick_notices: HashMap<PlayerId, mpsc::Sender<KickReason>>,
    player_count: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

impl<T: TickSource> GameArena<T> {
    /// Create the arena and the handle used to talk to it
    pub fn new(config: ArenaConfig, ticker: T) -> (Self, ArenaHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (update_tx, _) = broadcast::channel(64);
        let player_count = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicBool::new(false));

        let handle = ArenaHandle {
            command_tx,
            update_tx: update_tx.clone(),
            player_count: player_count.clone(),
            running: running.clone(),
        };

        let seed = config.seed.unwrap_or_else(rand::random);
        info!(seed, round_length = config.round_length, "Arena created");

        let arena = Self {
            state: ArenaState::new(config, seed),
            ticker,
            command_rx,
            update_tx,
            kick_notices: HashMap::new(),
            player_count,
            running,
        };

        (arena, handle)
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!("Arena task started");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                _ = self.ticker.next_tick() => self.run_tick(),
            }
        }

        info!("Arena task stopped");
    }

    fn handle_command(&mut self, command: ArenaCommand) {
        match command {
            ArenaCommand::Join {
                id,
                nickname,
                kick_tx,
                reply,
            } => {
                let result = self.state.join(id, nickname.as_deref());
                match &result {
                    Ok(player) => {
                        self.kick_notices.insert(id, kick_tx);
                        info!(
                            player_id = %id,
                            name = %player.name,
                            player_count = self.state.players.len(),
                            "Player joined arena"
                        )
                    }
                    Err(e) => warn!(player_id = %id, error = %e, "Join rejected"),
                }
                let _ = reply.send(result);
            }
            ArenaCommand::Input { id, keys } => {
                if !self.state.set_input(&id, keys) {
                    debug!(player_id = %id, "Input for unknown player ignored");
                }
            }
            ArenaCommand::Leave { id } => {
                self.kick_notices.remove(&id);
                if let Some(player) = self.state.leave(&id) {
                    info!(
                        player_id = %id,
                        name = %player.name,
                        player_count = self.state.players.len(),
                        "Player left arena"
                    );
                }
            }
        }
        self.sync_ticker();
    }

    fn run_tick(&mut self) {
        if !self.state.round.is_running() {
            return;
        }

        let TickOutput { snapshot, events } = self.state.step();
        self.log_events(&events);
        self.notify_kicked(&events);

        // No subscribers is fine
        let _ = self.update_tx.send(ServerMsg::MapUpdate { snapshot, events });

        self.sync_ticker();
    }

    /// Keep the tick source and shared counters in line with the round
    fn sync_ticker(&mut self) {
        let running = self.state.round.is_running();
        if running && !self.ticker.is_running() {
            self.ticker.start();
            info!("Ticker started");
        } else if !running && self.ticker.is_running() {
            self.ticker.stop();
            info!("Ticker stopped");
        }
        self.running.store(running, Ordering::Relaxed);
        self.player_count
            .store(self.state.players.len(), Ordering::Relaxed);
    }

    /// Tell kicked players' sessions directly
    fn notify_kicked(&mut self, events: &[ArenaEvent]) {
        for event in events {
            if let ArenaEvent::PlayerKicked { id, reason } = event {
                if let Some(kick_tx) = self.kick_notices.remove(id) {
                    // Fails only once the session is gone
                    let _ = kick_tx.try_send(*reason);
                }
            }
        }
    }

    fn log_events(&self, events: &[ArenaEvent]) {
        for event in events {
            match event {
                ArenaEvent::PlayerKicked { id, reason } => {
                    info!(player_id = %id, reason = ?reason, "Player kicked")
                }
                ArenaEvent::PlayerEliminated { id, penalty } => {
                    debug!(player_id = %id, penalty, "Player eliminated")
                }
                ArenaEvent::PlayerRescued { id } => debug!(player_id = %id, "Player rescued"),
                ArenaEvent::PowerUpCollected {
                    player_id, kind, ..
                } => debug!(player_id = %player_id, kind = ?kind, "Power-up collected"),
                ArenaEvent::RoundReset => {
                    info!(players = self.state.players.len(), "Round reset")
                }
                ArenaEvent::PlayerConnected { .. } => {}
            }
        }
    }
}
