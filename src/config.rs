//! Runtime configuration.
//!
//! DESIGN
//! ======
//! All knobs come from environment variables with sane defaults, parsed once
//! at startup into an immutable `Config` that is shared through `AppState`.
//! `.env` files are loaded by `main` before this runs.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CANVAS_WIDTH: u32 = 500;
const DEFAULT_CANVAS_HEIGHT: u32 = 500;

/// Seconds a user must wait between accepted placements.
const DEFAULT_PIXEL_COOLDOWN_SECS: u64 = 300;

const DEFAULT_CANVAS_TTL_SECS: u64 = 60;
const DEFAULT_COUNTER_TTL_SECS: u64 = 300;

const DEFAULT_CACHE_OP_TIMEOUT_MS: u64 = 250;
const DEFAULT_CACHE_PROBE_INTERVAL_SECS: u64 = 15;

const DEFAULT_VIEWER_BUFFER: usize = 256;
const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 4096;
const DEFAULT_PIXEL_BATCH_SIZE: usize = 20;
const DEFAULT_PIXEL_BATCH_DELAY_MS: u64 = 100;

const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 30;
const DEFAULT_COOLDOWN_SWEEP_INTERVAL_SECS: u64 = 60;

const DEFAULT_PORT: u16 = 5000;

/// Parse an environment variable, falling back to a default on absence or
/// parse failure.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Immutable service configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Canvas width in cells.
    pub width: u32,
    /// Canvas height in cells.
    pub height: u32,
    /// Minimum interval between a user's accepted placements.
    pub pixel_cooldown: Duration,
    /// TTL for the cached full-canvas snapshot.
    pub canvas_ttl: Duration,
    /// TTL for cached pixel counters.
    pub counter_ttl: Duration,
    /// Primary cache backend URL. `None` disables the primary entirely.
    pub redis_url: Option<String>,
    /// Upper bound on any single primary-cache operation.
    pub cache_op_timeout: Duration,
    /// How often a downgraded primary backend is re-probed.
    pub cache_probe_interval: Duration,
    /// Outbound buffer size per live viewer connection.
    pub viewer_buffer: usize,
    /// Capacity of the shared placement-event queue feeding the fan-out task.
    pub event_queue_capacity: usize,
    /// Events coalesced into one outbound message, at most.
    pub pixel_batch_size: usize,
    /// Coalescing window for outbound pixel batches.
    pub pixel_batch_delay: Duration,
    /// Where the periodic snapshot checkpoint is written.
    pub snapshot_path: PathBuf,
    /// Interval between snapshot checkpoints.
    pub snapshot_interval: Duration,
    /// Interval between cooldown-table sweeps.
    pub cooldown_sweep_interval: Duration,
    /// HTTP listen port.
    pub port: u16,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            width: env_parse("CANVAS_WIDTH", DEFAULT_CANVAS_WIDTH),
            height: env_parse("CANVAS_HEIGHT", DEFAULT_CANVAS_HEIGHT),
            pixel_cooldown: Duration::from_secs(env_parse("PIXEL_COOLDOWN", DEFAULT_PIXEL_COOLDOWN_SECS)),
            canvas_ttl: Duration::from_secs(env_parse("CACHE_CANVAS_TTL", DEFAULT_CANVAS_TTL_SECS)),
            counter_ttl: Duration::from_secs(env_parse("CACHE_COUNTER_TTL", DEFAULT_COUNTER_TTL_SECS)),
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            cache_op_timeout: Duration::from_millis(env_parse("CACHE_OP_TIMEOUT_MS", DEFAULT_CACHE_OP_TIMEOUT_MS)),
            cache_probe_interval: Duration::from_secs(env_parse(
                "CACHE_PROBE_INTERVAL_SECS",
                DEFAULT_CACHE_PROBE_INTERVAL_SECS,
            )),
            viewer_buffer: env_parse("VIEWER_BUFFER", DEFAULT_VIEWER_BUFFER),
            event_queue_capacity: env_parse("EVENT_QUEUE_CAPACITY", DEFAULT_EVENT_QUEUE_CAPACITY),
            pixel_batch_size: env_parse("PIXEL_BATCH_SIZE", DEFAULT_PIXEL_BATCH_SIZE),
            pixel_batch_delay: Duration::from_millis(env_parse("PIXEL_BATCH_DELAY_MS", DEFAULT_PIXEL_BATCH_DELAY_MS)),
            snapshot_path: std::env::var("SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("canvas.json")),
            snapshot_interval: Duration::from_secs(env_parse("SNAPSHOT_INTERVAL_SECS", DEFAULT_SNAPSHOT_INTERVAL_SECS)),
            cooldown_sweep_interval: Duration::from_secs(env_parse(
                "COOLDOWN_SWEEP_INTERVAL_SECS",
                DEFAULT_COOLDOWN_SWEEP_INTERVAL_SECS,
            )),
            port: env_parse("PORT", DEFAULT_PORT),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
