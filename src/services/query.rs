//! Cache-first read paths.
//!
//! Every read tries the cache tier and rebuilds from the authoritative
//! store on a miss, so reads stay correct with the cache fully offline.

use uuid::Uuid;

use crate::cache::keys::ReconcileReport;
use crate::canvas::CanvasWire;
use crate::state::AppState;

/// Pixel statistics for one caller.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct UserStats {
    pub user_pixels: i64,
    pub total_pixels: i64,
}

/// Full canvas in wire form, cache-first.
pub async fn canvas_wire(state: &AppState) -> CanvasWire {
    if let Some(wire) = state.cache.get_canvas().await {
        return wire;
    }

    let wire = state.canvas.snapshot().to_wire();
    state.cache.set_canvas(&wire).await;
    wire
}

/// Total placed pixels, cache-first with recount on miss.
pub async fn total_pixels(state: &AppState) -> i64 {
    if let Some(total) = state.cache.get_total_pixels().await {
        return total;
    }

    let total = state.canvas.snapshot().len() as i64;
    state.cache.set_total_pixels(total).await;
    total
}

/// Per-user and total counts, cache-first with recount on miss.
pub async fn user_stats(state: &AppState, user_id: Uuid) -> UserStats {
    let total = total_pixels(state).await;

    let user = if let Some(count) = state.cache.get_user_pixels(user_id).await {
        count
    } else {
        let count = state
            .canvas
            .snapshot()
            .count_by_owner()
            .get(&user_id)
            .copied()
            .unwrap_or(0);
        state.cache.set_user_pixels(user_id, count).await;
        count
    };

    UserStats { user_pixels: user, total_pixels: total }
}

/// Recompute every counter from a fresh snapshot. The repair path for
/// counter drift; never required for write correctness.
pub async fn reconcile_counters(state: &AppState) -> ReconcileReport {
    let snapshot = state.canvas.snapshot();
    let report = state.cache.reconcile(&snapshot).await;
    tracing::info!(
        total_pixels = report.total_pixels,
        user_count = report.user_count,
        "reconciled counters from snapshot"
    );
    report
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
