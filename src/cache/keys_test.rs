use std::collections::HashMap;
use std::time::Duration;

use super::*;
use crate::canvas::{CanvasStore, Color, Coord, PixelRecord, Snapshot};

fn cache() -> CanvasCache {
    let tier = TieredCache::new(None, Duration::from_millis(50));
    CanvasCache::new(tier, Duration::from_secs(60), Duration::from_secs(300))
}

fn placement(owner: Uuid, is_new_cell: bool, previous_owner: Option<Uuid>) -> PlaceResult {
    PlaceResult {
        coord: Coord { x: 1, y: 1 },
        record: PixelRecord { color: Color::parse("#FF0000").unwrap(), placed_at: 1, owner },
        is_new_cell,
        previous_owner,
    }
}

#[tokio::test]
async fn new_cell_bumps_total_and_owner() {
    let cache = cache();
    let alice = Uuid::new_v4();

    cache.apply_placement(&placement(alice, true, None)).await;

    assert_eq!(cache.get_total_pixels().await, Some(1));
    assert_eq!(cache.get_user_pixels(alice).await, Some(1));
}

#[tokio::test]
async fn takeover_moves_one_count_between_users() {
    let cache = cache();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    cache.apply_placement(&placement(alice, true, None)).await;
    cache.apply_placement(&placement(bob, false, Some(alice))).await;

    assert_eq!(cache.get_total_pixels().await, Some(1));
    assert_eq!(cache.get_user_pixels(alice).await, Some(0));
    assert_eq!(cache.get_user_pixels(bob).await, Some(1));
}

#[tokio::test]
async fn repainting_own_cell_changes_nothing() {
    let cache = cache();
    let alice = Uuid::new_v4();

    cache.apply_placement(&placement(alice, true, None)).await;
    cache.apply_placement(&placement(alice, false, Some(alice))).await;

    assert_eq!(cache.get_total_pixels().await, Some(1));
    assert_eq!(cache.get_user_pixels(alice).await, Some(1));
}

#[tokio::test]
async fn placement_invalidates_canvas_entry() {
    let cache = cache();
    let canvas = CanvasStore::new(3, 3);
    canvas.place(canvas.coord(0, 0).unwrap(), Color::parse("#111111").unwrap(), Uuid::new_v4(), 1);

    let wire = canvas.snapshot().to_wire();
    cache.set_canvas(&wire).await;
    assert_eq!(cache.get_canvas().await, Some(wire));

    cache.apply_placement(&placement(Uuid::new_v4(), true, None)).await;
    assert_eq!(cache.get_canvas().await, None);
}

#[tokio::test]
async fn corrupt_canvas_entry_is_discarded() {
    let cache = cache();
    cache
        .tier()
        .set(CANVAS_KEY, "not json", Duration::from_secs(60))
        .await;

    assert_eq!(cache.get_canvas().await, None);
    // The broken entry was deleted outright, not just skipped.
    assert_eq!(cache.tier().get(CANVAS_KEY).await, None);
}

#[tokio::test]
async fn reconcile_overwrites_drifted_counters() {
    let cache = cache();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    // Simulate drift: counters wildly off from the grid.
    cache.set_total_pixels(999).await;
    cache.set_user_pixels(alice, 500).await;

    let mut cells = HashMap::new();
    cells.insert(
        Coord { x: 0, y: 0 },
        PixelRecord { color: Color::parse("#111111").unwrap(), placed_at: 1, owner: alice },
    );
    cells.insert(
        Coord { x: 1, y: 0 },
        PixelRecord { color: Color::parse("#222222").unwrap(), placed_at: 2, owner: bob },
    );
    cells.insert(
        Coord { x: 2, y: 0 },
        PixelRecord { color: Color::parse("#333333").unwrap(), placed_at: 3, owner: bob },
    );
    let snapshot = Snapshot { cells };

    let report = cache.reconcile(&snapshot).await;
    assert_eq!(report.total_pixels, 3);
    assert_eq!(report.user_count, 2);
    assert_eq!(cache.get_total_pixels().await, Some(3));
    assert_eq!(cache.get_user_pixels(alice).await, Some(1));
    assert_eq!(cache.get_user_pixels(bob).await, Some(2));
}
