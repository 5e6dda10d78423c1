//! Per-user placement cooldown.
//!
//! DESIGN
//! ======
//! One `lastAccepted` instant per user behind a single mutex. Check and
//! update happen under the same lock, so two simultaneous requests from one
//! user can never both be admitted inside one cooldown window.
//!
//! Entries are evicted by a periodic sweep once their window has fully
//! elapsed; a missing entry simply means "no cooldown", so eviction is a
//! memory-bound concern, not a correctness one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

// =============================================================================
// DECISION
// =============================================================================

/// Outcome of a cooldown check-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// The window had elapsed (or no entry existed); `lastAccepted` is now
    /// stamped to the supplied instant.
    Allowed,
    /// The window is still open. No state was changed.
    Denied {
        /// Whole seconds until the next placement is admitted, rounded up.
        remaining_secs: u64,
    },
}

impl CooldownDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, CooldownDecision::Allowed)
    }
}

// =============================================================================
// GATE
// =============================================================================

/// Shared cooldown gate. Clone is cheap; all clones share one table.
#[derive(Clone)]
pub struct CooldownGate {
    inner: Arc<Mutex<HashMap<Uuid, Instant>>>,
    cooldown: Duration,
}

impl CooldownGate {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), cooldown }
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Atomically admit the user if their window has elapsed, stamping a new
    /// `lastAccepted` on success.
    pub fn try_acquire(&self, user_id: Uuid) -> CooldownDecision {
        self.try_acquire_at(user_id, Instant::now())
    }

    /// Internal: check-and-set with explicit clock (for testing).
    pub(crate) fn try_acquire_at(&self, user_id: Uuid, now: Instant) -> CooldownDecision {
        let mut entries = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(last_accepted) = entries.get(&user_id) {
            // saturating_duration_since clamps negative elapsed time to zero,
            // tolerating clock restarts across the stored instant.
            let elapsed = now.saturating_duration_since(*last_accepted);
            if elapsed < self.cooldown {
                return CooldownDecision::Denied { remaining_secs: ceil_secs(self.cooldown - elapsed) };
            }
        }

        entries.insert(user_id, now);
        CooldownDecision::Allowed
    }

    /// Read-only peek at the user's remaining window. Zero when absent or
    /// elapsed; never consumes the window.
    #[must_use]
    pub fn remaining_secs(&self, user_id: Uuid) -> u64 {
        self.remaining_secs_at(user_id, Instant::now())
    }

    pub(crate) fn remaining_secs_at(&self, user_id: Uuid, now: Instant) -> u64 {
        let entries = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(last_accepted) = entries.get(&user_id) else {
            return 0;
        };
        let elapsed = now.saturating_duration_since(*last_accepted);
        if elapsed >= self.cooldown {
            return 0;
        }
        ceil_secs(self.cooldown - elapsed)
    }

    /// Drop entries whose window has fully elapsed.
    pub fn sweep_expired(&self) {
        self.sweep_expired_at(Instant::now());
    }

    pub(crate) fn sweep_expired_at(&self, now: Instant) {
        let mut entries = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, last_accepted| now.saturating_duration_since(*last_accepted) < self.cooldown);
        let evicted = before - entries.len();
        if evicted > 0 {
            info!(evicted, remaining = entries.len(), "swept expired cooldown entries");
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_users(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Spawn the periodic cooldown sweep task.
pub fn spawn_sweep_task(gate: CooldownGate, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            gate.sweep_expired();
        }
    })
}

/// Whole seconds in `dur`, rounded up.
fn ceil_secs(dur: Duration) -> u64 {
    let secs = dur.as_secs();
    if dur.subsec_nanos() > 0 { secs + 1 } else { secs }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
