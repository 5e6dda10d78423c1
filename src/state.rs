//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! owns the authoritative canvas store and the collaborators around it:
//! cooldown gate, cache tier, and event broadcaster. Clone is required by
//! Axum; every field is Arc-backed or internally shared.

use std::sync::Arc;

use crate::cache::CanvasCache;
use crate::canvas::CanvasStore;
use crate::config::Config;
use crate::events::Broadcaster;
use crate::rate_limit::CooldownGate;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub canvas: Arc<CanvasStore>,
    pub cooldowns: CooldownGate,
    pub cache: CanvasCache,
    pub broadcaster: Broadcaster,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, cache: CanvasCache, broadcaster: Broadcaster) -> Self {
        let canvas = Arc::new(CanvasStore::new(config.width, config.height));
        let cooldowns = CooldownGate::new(config.pixel_cooldown);
        Self { config: Arc::new(config), canvas, cooldowns, cache, broadcaster }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::cache::TieredCache;

    /// Config sized for tests: small canvas, short windows, no primary cache.
    #[must_use]
    pub fn test_config() -> Config {
        Config {
            width: 10,
            height: 10,
            pixel_cooldown: Duration::from_secs(5),
            canvas_ttl: Duration::from_secs(60),
            counter_ttl: Duration::from_secs(300),
            redis_url: None,
            cache_op_timeout: Duration::from_millis(50),
            cache_probe_interval: Duration::from_secs(15),
            viewer_buffer: 8,
            event_queue_capacity: 64,
            pixel_batch_size: 20,
            pixel_batch_delay: Duration::from_millis(20),
            snapshot_path: PathBuf::from("canvas-test.json"),
            snapshot_interval: Duration::from_secs(30),
            cooldown_sweep_interval: Duration::from_secs(60),
            port: 0,
        }
    }

    /// App state backed by the in-process cache only. Must run inside a
    /// tokio runtime (the broadcaster spawns its fan-out task).
    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app_state_with(test_config())
    }

    #[must_use]
    pub fn test_app_state_with(config: Config) -> AppState {
        let tier = TieredCache::new(None, config.cache_op_timeout);
        let cache = CanvasCache::new(tier, config.canvas_ttl, config.counter_ttl);
        let broadcaster = Broadcaster::spawn(&config);
        AppState::new(config, cache, broadcaster)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
