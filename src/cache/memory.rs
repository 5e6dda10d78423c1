//! In-process fallback cache backend.
//!
//! A mutex-guarded map with per-entry expiry. Expired entries are dropped
//! lazily on read and in bulk by `sweep_expired`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{CacheBackend, CacheError};

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.retain(|_, entry| entry.expires_at > now);
    }

    fn read_live(&self, key: &str, now: Instant) -> Option<String> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.read_live(key, Instant::now()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), MemoryEntry { value: value.to_string(), expires_at: Instant::now() + ttl });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64, CacheError> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let current = match entries.get(key) {
            Some(entry) if entry.expires_at > now => entry.value.parse::<i64>().unwrap_or(0),
            _ => 0,
        };
        let next = current.saturating_add(delta);
        entries.insert(key.to_string(), MemoryEntry { value: next.to_string(), expires_at: now + ttl });
        Ok(next)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
