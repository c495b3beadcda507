//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::ArenaHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: ArenaHandle,
}

impl AppState {
    pub fn new(config: Config, arena: ArenaHandle) -> Self {
        Self {
            config: Arc::new(config),
            arena,
        }
    }
}
