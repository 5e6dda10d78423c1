use std::sync::Arc;

use uuid::Uuid;

use super::*;
use crate::cache::test_support::FailingBackend;
use crate::cache::{CanvasCache, TieredCache};
use crate::services::placement::{self, PlacementRequest};
use crate::state::AppState;
use crate::state::test_helpers::{test_app_state, test_config};

fn request(x: i64, y: i64, color: &str) -> PlacementRequest {
    PlacementRequest { x, y, color: color.to_string() }
}

#[tokio::test]
async fn canvas_read_rebuilds_on_miss_and_fills_cache() {
    let state = test_app_state();
    let user = Uuid::new_v4();
    placement::place_pixel(&state, user, &request(1, 2, "#FF0000"))
        .await
        .unwrap();

    // Placement invalidated the snapshot entry; the read rebuilds it.
    assert_eq!(state.cache.get_canvas().await, None);
    let wire = canvas_wire(&state).await;
    assert_eq!(wire.len(), 1);
    assert_eq!(wire["1,2"].color, "#FF0000");

    // Second read is served from the freshly filled cache.
    assert_eq!(state.cache.get_canvas().await, Some(wire));
}

#[tokio::test]
async fn read_after_invalidation_reflects_latest_write() {
    let state = test_app_state();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    placement::place_pixel(&state, alice, &request(0, 0, "#111111"))
        .await
        .unwrap();
    let _ = canvas_wire(&state).await;

    // Bob overwrites the same cell; the cached copy must not survive.
    placement::place_pixel(&state, bob, &request(0, 0, "#222222"))
        .await
        .unwrap();
    let wire = canvas_wire(&state).await;
    assert_eq!(wire["0,0"].color, "#222222");
}

#[tokio::test]
async fn user_stats_recomputes_from_snapshot_on_miss() {
    let state = test_app_state();
    let user = Uuid::new_v4();

    placement::place_pixel(&state, user, &request(3, 3, "#333333"))
        .await
        .unwrap();

    // Wipe the counters to simulate eviction; the read path recounts.
    state.cache.tier().delete(crate::cache::keys::TOTAL_PIXELS_KEY).await;
    state
        .cache
        .tier()
        .delete(&crate::cache::keys::user_pixels_key(user))
        .await;

    let stats = user_stats(&state, user).await;
    assert_eq!(stats.total_pixels, 1);
    assert_eq!(stats.user_pixels, 1);

    let stranger = user_stats(&state, Uuid::new_v4()).await;
    assert_eq!(stranger.user_pixels, 0);
}

#[tokio::test]
async fn reconcile_repairs_drifted_counters() {
    let state = test_app_state();
    let user = Uuid::new_v4();

    placement::place_pixel(&state, user, &request(5, 5, "#555555"))
        .await
        .unwrap();

    // Drift the counters away from the grid.
    state.cache.set_total_pixels(42).await;
    state.cache.set_user_pixels(user, 42).await;

    let report = reconcile_counters(&state).await;
    assert_eq!(report.total_pixels, 1);
    assert_eq!(total_pixels(&state).await, 1);
    assert_eq!(user_stats(&state, user).await.user_pixels, 1);
}

/// With the primary backend failing for the entire run, placements and
/// reads still produce correct results through the in-process fallback.
#[tokio::test]
async fn everything_works_with_primary_cache_offline() {
    let config = test_config();
    let tier = TieredCache::new(Some(Arc::new(FailingBackend)), config.cache_op_timeout);
    let cache = CanvasCache::new(tier, config.canvas_ttl, config.counter_ttl);
    let broadcaster = crate::events::Broadcaster::spawn(&config);
    let state = AppState::new(config, cache, broadcaster);

    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    placement::place_pixel(&state, alice, &request(0, 0, "#111111"))
        .await
        .unwrap();
    placement::place_pixel(&state, bob, &request(0, 0, "#222222"))
        .await
        .unwrap();
    placement::place_pixel(&state, bob, &request(1, 0, "#333333"))
        .await
        .unwrap();

    let wire = canvas_wire(&state).await;
    assert_eq!(wire.len(), 2);
    assert_eq!(wire["0,0"].color, "#222222");

    assert_eq!(total_pixels(&state).await, 2);
    let stats = user_stats(&state, bob).await;
    assert_eq!(stats.user_pixels, 2);
    assert_eq!(user_stats(&state, alice).await.user_pixels, 0);
}
