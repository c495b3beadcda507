//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the pretty format
    pub log_json: bool,
    /// Allowed client origins for CORS (empty = any)
    pub client_origins: Vec<String>,
    /// Simulation tunables
    pub arena: ArenaConfig,
}

/// Tunables of the arena simulation
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaConfig {
    /// Wall-clock period of one tick
    pub tick_interval: Duration,
    /// Ticks per round; the ring reaches radius 0 at this tick
    pub round_length: u32,
    /// Base max speed per axis
    pub max_speed: f32,
    /// Base acceleration per tick
    pub acceleration: f32,
    /// Multiplicative velocity damping per tick
    pub friction: f32,
    /// Radius of every player avatar
    pub ball_radius: f32,
    /// Weight of the virtual body at the origin used for wall bounces
    pub wall_weight: f32,
    /// Post-collision boost for the slower party (1.0 = pure elastic)
    pub pinball_factor: f32,
    /// Ticks after a rescue pickup before the grant can be used
    pub rescue_cooldown_ticks: u32,
    /// Rejection-sampling bound for power-up spawns
    pub spawn_attempts: u32,
    /// Rejection-sampling bound for join placement
    pub placement_attempts: u32,
    /// RNG seed; random when unset
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(20),
            round_length: 1500,
            max_speed: 14.0,
            acceleration: 0.9,
            friction: 0.997,
            ball_radius: 20.0,
            wall_weight: 20.0,
            pinball_factor: 1.0,
            rescue_cooldown_ticks: 200,
            spawn_attempts: 20,
            placement_attempts: 100,
            seed: None,
        }
    }
}

impl ArenaConfig {
    /// Load arena tunables, falling back to defaults for unset variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let tick_ms: u64 = env_or("TICK_INTERVAL_MS", defaults.tick_interval.as_millis() as u64)?;
        let seed = match env::var("ARENA_SEED") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                key: "ARENA_SEED",
                value: raw,
            })?),
            Err(_) => None,
        };

        let config = Self {
            tick_interval: Duration::from_millis(tick_ms),
            round_length: env_or("ROUND_LENGTH_TICKS", defaults.round_length)?,
            max_speed: env_or("MAX_SPEED", defaults.max_speed)?,
            acceleration: env_or("ACCELERATION", defaults.acceleration)?,
            friction: env_or("FRICTION", defaults.friction)?,
            ball_radius: env_or("BALL_RADIUS", defaults.ball_radius)?,
            wall_weight: env_or("WALL_WEIGHT", defaults.wall_weight)?,
            pinball_factor: env_or("PINBALL_FACTOR", defaults.pinball_factor)?,
            rescue_cooldown_ticks: env_or("RESCUE_COOLDOWN_TICKS", defaults.rescue_cooldown_ticks)?,
            spawn_attempts: env_or("POWERUP_SPAWN_ATTEMPTS", defaults.spawn_attempts)?,
            placement_attempts: env_or("PLACEMENT_ATTEMPTS", defaults.placement_attempts)?,
            seed,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::OutOfRange("TICK_INTERVAL_MS"));
        }
        if self.round_length == 0 {
            return Err(ConfigError::OutOfRange("ROUND_LENGTH_TICKS"));
        }
        if !(self.ball_radius > 0.0) {
            return Err(ConfigError::OutOfRange("BALL_RADIUS"));
        }
        if !(self.wall_weight > 0.0) {
            return Err(ConfigError::OutOfRange("WALL_WEIGHT"));
        }
        if !(self.friction > 0.0 && self.friction <= 1.0) {
            return Err(ConfigError::OutOfRange("FRICTION"));
        }
        if !(self.max_speed >= 0.0) {
            return Err(ConfigError::OutOfRange("MAX_SPEED"));
        }
        if !(self.pinball_factor > 0.0) {
            return Err(ConfigError::OutOfRange("PINBALL_FACTOR"));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render-style PORT wins over SERVER_ADDR
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        let client_origins = env::var("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            client_origins,
            arena: ArenaConfig::from_env()?,
        })
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for environment variable {key}")]
    Invalid { key: &'static str, value: String },

    #[error("Value out of range for environment variable {0}")]
    OutOfRange(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
