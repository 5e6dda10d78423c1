//! Placement pipeline — one accepted write, end to end.
//!
//! DESIGN
//! ======
//! Validate the request at the boundary, consume the user's cooldown
//! window, mutate the store, then run the side effects: counter updates,
//! snapshot invalidation, and the broadcast enqueue. The store mutation is
//! the only critical section; cache and broadcast work happens strictly
//! after it so lock hold time stays minimal.
//!
//! ERROR HANDLING
//! ==============
//! Validation failures and active cooldowns reject before any mutation.
//! Past the store write there is nothing left that can fail the request:
//! cache errors degrade inside the tier and broadcast delivery is
//! best-effort per viewer.

use std::time::Instant;

use uuid::Uuid;

use crate::canvas::{self, CanvasError, Color};
use crate::events::PixelEvent;
use crate::rate_limit::CooldownDecision;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

/// Raw placement request as it arrives from the transport layer.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PlacementRequest {
    pub x: i64,
    pub y: i64,
    pub color: String,
}

/// An accepted placement.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Seconds until this user may place again.
    pub cooldown_secs: u64,
    pub is_new_cell: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error(transparent)]
    Invalid(#[from] CanvasError),
    #[error("cooldown active: {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },
}

impl PlacementError {
    /// Stable machine-readable rejection reason.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Invalid(CanvasError::InvalidCoordinate { .. }) => "invalid_coordinate",
            Self::Invalid(CanvasError::InvalidColor(_)) => "invalid_color",
            Self::CooldownActive { .. } => "cooldown_active",
        }
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Run one placement through the full pipeline.
///
/// # Errors
///
/// Returns a validation error for out-of-bounds coordinates or malformed
/// colors, and a cooldown rejection carrying the remaining seconds when the
/// user's window has not elapsed. Neither mutates any state.
pub async fn place_pixel(
    state: &AppState,
    user_id: Uuid,
    request: &PlacementRequest,
) -> Result<Placement, PlacementError> {
    place_pixel_at(state, user_id, request, Instant::now(), canvas::now_ms()).await
}

/// Internal: pipeline with explicit clocks (for testing).
pub(crate) async fn place_pixel_at(
    state: &AppState,
    user_id: Uuid,
    request: &PlacementRequest,
    now: Instant,
    now_ms: i64,
) -> Result<Placement, PlacementError> {
    // Validate before touching the cooldown, so a malformed request never
    // burns the user's window.
    let coord = state.canvas.coord(request.x, request.y)?;
    let color = Color::parse(&request.color)?;

    match state.cooldowns.try_acquire_at(user_id, now) {
        CooldownDecision::Allowed => {}
        CooldownDecision::Denied { remaining_secs } => {
            return Err(PlacementError::CooldownActive { remaining_secs });
        }
    }

    // The atomic store write; everything after this is a side effect.
    let result = state.canvas.place(coord, color, user_id, now_ms);
    tracing::info!(%user_id, x = coord.x, y = coord.y, new_cell = result.is_new_cell, "pixel placed");

    state.cache.apply_placement(&result).await;
    state.broadcaster.publish(PixelEvent::from_result(&result));

    Ok(Placement {
        cooldown_secs: state.cooldowns.cooldown().as_secs(),
        is_new_cell: result.is_new_cell,
    })
}

#[cfg(test)]
#[path = "placement_test.rs"]
mod tests;
