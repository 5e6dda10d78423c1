//! Two-level cache selection with health-checked downgrade.
//!
//! DESIGN
//! ======
//! Every operation prefers the primary backend while it is marked healthy,
//! bounded by a timeout. Any error or timeout flips the health flag, logs
//! the downgrade once, and the operation (plus all following ones) lands on
//! the in-process fallback. A background probe pings the primary and
//! restores it when it answers again.
//!
//! ERROR HANDLING
//! ==============
//! Fallback errors cannot really happen (it is an in-process map), but if
//! one ever did it degrades to a miss. No caller sees a cache error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::memory::MemoryBackend;
use super::{CacheBackend, CacheError};

#[derive(Clone)]
pub struct TieredCache {
    primary: Option<Arc<dyn CacheBackend>>,
    fallback: MemoryBackend,
    primary_healthy: Arc<AtomicBool>,
    op_timeout: Duration,
}

impl TieredCache {
    /// Build a tier over an optional primary. `None` runs fallback-only,
    /// which is also the degraded mode after a failed resolve.
    #[must_use]
    pub fn new(primary: Option<Arc<dyn CacheBackend>>, op_timeout: Duration) -> Self {
        let has_primary = primary.is_some();
        Self {
            primary,
            fallback: MemoryBackend::new(),
            primary_healthy: Arc::new(AtomicBool::new(has_primary)),
            op_timeout,
        }
    }

    /// Resolve the primary backend from configuration: connect, ping, and
    /// downgrade to fallback-only on any failure. Never fails the caller.
    pub async fn resolve(redis_url: Option<&str>, op_timeout: Duration) -> Self {
        let Some(url) = redis_url else {
            info!("no primary cache configured; using in-process cache only");
            return Self::new(None, op_timeout);
        };

        let connect = tokio::time::timeout(op_timeout, super::redis::RedisBackend::connect(url)).await;
        match connect {
            Ok(Ok(backend)) => match tokio::time::timeout(op_timeout, backend.ping()).await {
                Ok(Ok(())) => {
                    info!("primary cache backend initialized");
                    Self::new(Some(Arc::new(backend)), op_timeout)
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "primary cache ping failed; using in-process fallback");
                    Self::new(None, op_timeout)
                }
                Err(_) => {
                    warn!("primary cache ping timed out; using in-process fallback");
                    Self::new(None, op_timeout)
                }
            },
            Ok(Err(e)) => {
                warn!(error = %e, "primary cache unavailable; using in-process fallback");
                Self::new(None, op_timeout)
            }
            Err(_) => {
                warn!("primary cache connect timed out; using in-process fallback");
                Self::new(None, op_timeout)
            }
        }
    }

    /// True while the primary backend is selected for operations.
    #[must_use]
    pub fn primary_active(&self) -> bool {
        self.primary.is_some() && self.primary_healthy.load(Ordering::Relaxed)
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(primary) = self.active_primary() {
            match self.run(primary.get(key)).await {
                Ok(value) => return value,
                Err(e) => self.downgrade("get", key, &e),
            }
        }
        self.fallback.get(key).await.unwrap_or_else(|e| {
            warn!(error = %e, key, "fallback cache get failed; treating as miss");
            None
        })
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        if let Some(primary) = self.active_primary() {
            match self.run(primary.set(key, value, ttl)).await {
                Ok(()) => return,
                Err(e) => self.downgrade("set", key, &e),
            }
        }
        if let Err(e) = self.fallback.set(key, value, ttl).await {
            warn!(error = %e, key, "fallback cache set failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Some(primary) = self.active_primary() {
            match self.run(primary.delete(key)).await {
                Ok(()) => return,
                Err(e) => self.downgrade("delete", key, &e),
            }
        }
        if let Err(e) = self.fallback.delete(key).await {
            warn!(error = %e, key, "fallback cache delete failed");
        }
    }

    pub async fn incr_by(&self, key: &str, delta: i64, ttl: Duration) -> Option<i64> {
        if let Some(primary) = self.active_primary() {
            match self.run(primary.incr_by(key, delta, ttl)).await {
                Ok(next) => return Some(next),
                Err(e) => self.downgrade("incr", key, &e),
            }
        }
        match self.fallback.incr_by(key, delta, ttl).await {
            Ok(next) => Some(next),
            Err(e) => {
                warn!(error = %e, key, "fallback cache incr failed");
                None
            }
        }
    }

    /// Spawn the background probe that restores a downgraded primary.
    pub fn spawn_health_probe(&self, interval: Duration) -> JoinHandle<()> {
        let tier = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                tier.probe_primary().await;
            }
        })
    }

    async fn probe_primary(&self) {
        let Some(primary) = &self.primary else {
            return;
        };
        if self.primary_healthy.load(Ordering::Relaxed) {
            return;
        }
        match self.run(primary.ping()).await {
            Ok(()) => {
                self.primary_healthy.store(true, Ordering::Relaxed);
                info!(backend = primary.name(), "primary cache restored");
            }
            Err(e) => {
                warn!(backend = primary.name(), error = %e, "primary cache still unavailable");
            }
        }
    }

    fn active_primary(&self) -> Option<&Arc<dyn CacheBackend>> {
        if self.primary_healthy.load(Ordering::Relaxed) {
            self.primary.as_ref()
        } else {
            None
        }
    }

    async fn run<T>(&self, op: impl std::future::Future<Output = Result<T, CacheError>>) -> Result<T, CacheError> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        }
    }

    fn downgrade(&self, op: &'static str, key: &str, err: &CacheError) {
        if self.primary_healthy.swap(false, Ordering::Relaxed) {
            warn!(op, key, error = %err, "primary cache error; downgrading to in-process fallback");
        }
    }

    #[cfg(test)]
    pub(crate) async fn probe_primary_for_tests(&self) {
        self.probe_primary().await;
    }
}

#[cfg(test)]
#[path = "tiered_test.rs"]
mod tests;
