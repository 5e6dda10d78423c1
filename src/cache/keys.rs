//! Canvas keyspace over the cache tier.
//!
//! DESIGN
//! ======
//! One wrapper owns every cache key the service uses:
//! - `mural:canvas` — JSON wire snapshot, short TTL, deleted (never patched)
//!   on each accepted placement so readers always rebuild from the store.
//! - `mural:total_pixels` / `mural:user_pixels:{id}` — integer counters
//!   updated incrementally from the atomic placement result.
//!
//! Counters may drift after evictions or a downgrade mid-stream; they are
//! repaired by `reconcile`, which recounts from an authoritative snapshot.
//! Nothing here is consulted for write correctness.

use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use super::TieredCache;
use crate::canvas::{CanvasWire, PlaceResult, Snapshot};

pub const CANVAS_KEY: &str = "mural:canvas";
pub const TOTAL_PIXELS_KEY: &str = "mural:total_pixels";

#[must_use]
pub fn user_pixels_key(user_id: Uuid) -> String {
    format!("mural:user_pixels:{user_id}")
}

/// Summary returned by a reconciliation pass.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ReconcileReport {
    pub total_pixels: u64,
    pub user_count: usize,
}

#[derive(Clone)]
pub struct CanvasCache {
    tier: TieredCache,
    canvas_ttl: Duration,
    counter_ttl: Duration,
}

impl CanvasCache {
    #[must_use]
    pub fn new(tier: TieredCache, canvas_ttl: Duration, counter_ttl: Duration) -> Self {
        Self { tier, canvas_ttl, counter_ttl }
    }

    #[must_use]
    pub fn tier(&self) -> &TieredCache {
        &self.tier
    }

    // =========================================================================
    // CANVAS SNAPSHOT
    // =========================================================================

    pub async fn get_canvas(&self) -> Option<CanvasWire> {
        let raw = self.tier.get(CANVAS_KEY).await?;
        match serde_json::from_str(&raw) {
            Ok(wire) => Some(wire),
            Err(e) => {
                // A corrupt entry is dropped so the next read rebuilds it.
                warn!(error = %e, "cached canvas failed to parse; discarding entry");
                self.tier.delete(CANVAS_KEY).await;
                None
            }
        }
    }

    pub async fn set_canvas(&self, wire: &CanvasWire) {
        match serde_json::to_string(wire) {
            Ok(raw) => self.tier.set(CANVAS_KEY, &raw, self.canvas_ttl).await,
            Err(e) => warn!(error = %e, "canvas snapshot failed to serialize; skipping cache fill"),
        }
    }

    pub async fn invalidate_canvas(&self) {
        self.tier.delete(CANVAS_KEY).await;
    }

    // =========================================================================
    // COUNTERS
    // =========================================================================

    pub async fn get_total_pixels(&self) -> Option<i64> {
        parse_counter(self.tier.get(TOTAL_PIXELS_KEY).await)
    }

    pub async fn set_total_pixels(&self, count: i64) {
        self.tier
            .set(TOTAL_PIXELS_KEY, &count.to_string(), self.counter_ttl)
            .await;
    }

    pub async fn get_user_pixels(&self, user_id: Uuid) -> Option<i64> {
        parse_counter(self.tier.get(&user_pixels_key(user_id)).await)
    }

    pub async fn set_user_pixels(&self, user_id: Uuid, count: i64) {
        self.tier
            .set(&user_pixels_key(user_id), &count.to_string(), self.counter_ttl)
            .await;
    }

    /// Fold one accepted placement into the counters, then invalidate the
    /// snapshot entry. New cell: total and owner both +1. Taking over another
    /// user's cell: owner +1, previous owner -1, total unchanged. Repainting
    /// your own cell: nothing moves.
    pub async fn apply_placement(&self, result: &PlaceResult) {
        let owner = result.record.owner;
        if result.is_new_cell {
            self.tier.incr_by(TOTAL_PIXELS_KEY, 1, self.counter_ttl).await;
            self.tier
                .incr_by(&user_pixels_key(owner), 1, self.counter_ttl)
                .await;
        } else if let Some(previous) = result.previous_owner {
            if previous != owner {
                self.tier
                    .incr_by(&user_pixels_key(owner), 1, self.counter_ttl)
                    .await;
                self.tier
                    .incr_by(&user_pixels_key(previous), -1, self.counter_ttl)
                    .await;
            }
        }

        self.invalidate_canvas().await;
    }

    /// Overwrite every counter from an authoritative recount.
    pub async fn reconcile(&self, snapshot: &Snapshot) -> ReconcileReport {
        let counts = snapshot.count_by_owner();
        self.set_total_pixels(snapshot.len() as i64).await;
        for (user_id, count) in &counts {
            self.set_user_pixels(*user_id, *count).await;
        }
        ReconcileReport { total_pixels: snapshot.len() as u64, user_count: counts.len() }
    }
}

fn parse_counter(raw: Option<String>) -> Option<i64> {
    let raw = raw?;
    match raw.parse::<i64>() {
        Ok(count) => Some(count),
        Err(_) => {
            warn!(raw, "cached counter failed to parse; treating as miss");
            None
        }
    }
}

#[cfg(test)]
#[path = "keys_test.rs"]
mod tests;
