//! Cache tier — read accelerator for snapshots and counters.
//!
//! DESIGN
//! ======
//! A single `CacheBackend` trait is implemented by a networked primary
//! (Redis) and an in-process fallback. `TieredCache` selects between them
//! per operation, downgrading to the fallback on any error or timeout and
//! logging the transition. Callers never see a cache failure: every error
//! degrades to a miss, and every read path has a canvas-store fallback.
//!
//! The cache is never authoritative. Snapshot staleness is bounded by TTL
//! and delete-on-write invalidation; counters are eventually consistent and
//! repaired by `keys::reconcile`.

pub mod keys;
pub mod memory;
pub mod redis;
pub mod tiered;

use std::time::Duration;

pub use keys::CanvasCache;
pub use tiered::TieredCache;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors produced by cache backend operations. Always recovered internally;
/// never propagated to request handlers.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache operation timed out")]
    Timeout,
}

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// Minimal key-value surface shared by the primary and fallback backends.
/// Values are opaque strings; callers own serialization.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Add `delta` to an integer counter, creating it at `delta` when
    /// absent. The TTL is refreshed on every call.
    async fn incr_by(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64, CacheError>;

    /// Cheap liveness check used by the resolver and the health probe.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Short backend label for log lines.
    fn name(&self) -> &'static str;
}
