use super::*;

fn store() -> CanvasStore {
    CanvasStore::new(3, 3)
}

#[test]
fn coord_accepts_bounds_and_rejects_outside() {
    let canvas = store();
    assert!(canvas.coord(0, 0).is_ok());
    assert!(canvas.coord(2, 2).is_ok());
    assert!(matches!(canvas.coord(3, 0), Err(CanvasError::InvalidCoordinate { .. })));
    assert!(matches!(canvas.coord(0, 3), Err(CanvasError::InvalidCoordinate { .. })));
    assert!(matches!(canvas.coord(-1, 0), Err(CanvasError::InvalidCoordinate { .. })));
}

#[test]
fn color_parse_validates_format() {
    assert!(Color::parse("#FF0000").is_ok());
    assert!(Color::parse("#abcdef").is_ok());
    assert!(matches!(Color::parse("FF0000"), Err(CanvasError::InvalidColor(_))));
    assert!(matches!(Color::parse("#FF00"), Err(CanvasError::InvalidColor(_))));
    assert!(matches!(Color::parse("#GG0000"), Err(CanvasError::InvalidColor(_))));
    assert!(matches!(Color::parse("#FF00000"), Err(CanvasError::InvalidColor(_))));
}

#[test]
fn place_reports_new_cell_then_overwrite() {
    let canvas = store();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let coord = canvas.coord(1, 1).unwrap();

    let first = canvas.place(coord, Color::parse("#FF0000").unwrap(), alice, 1);
    assert!(first.is_new_cell);
    assert_eq!(first.previous_owner, None);

    let second = canvas.place(coord, Color::parse("#00FF00").unwrap(), bob, 2);
    assert!(!second.is_new_cell);
    assert_eq!(second.previous_owner, Some(alice));

    let current = canvas.get(coord).unwrap();
    assert_eq!(current.owner, bob);
    assert_eq!(current.color.as_str(), "#00FF00");
    assert_eq!(current.placed_at, 2);
}

#[test]
fn last_accepted_write_wins_in_snapshot() {
    let canvas = store();
    let user = Uuid::new_v4();
    let coord = canvas.coord(0, 2).unwrap();

    for (i, color) in ["#111111", "#222222", "#333333"].iter().enumerate() {
        canvas.place(coord, Color::parse(color).unwrap(), user, i as i64);
    }

    let snapshot = canvas.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.cells[&coord].color.as_str(), "#333333");
}

#[test]
fn snapshot_wire_form_uses_comma_keys() {
    let canvas = store();
    let user = Uuid::new_v4();
    let coord = canvas.coord(2, 0).unwrap();
    canvas.place(coord, Color::parse("#0000FF").unwrap(), user, 7);

    let wire = canvas.snapshot().to_wire();
    let cell = wire.get("2,0").expect("cell present under \"x,y\" key");
    assert_eq!(cell.color, "#0000FF");
    assert_eq!(cell.timestamp, 7);
    assert_eq!(cell.user_id, user);
}

#[test]
fn count_by_owner_matches_grid() {
    let canvas = store();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    canvas.place(canvas.coord(0, 0).unwrap(), Color::parse("#111111").unwrap(), alice, 1);
    canvas.place(canvas.coord(1, 0).unwrap(), Color::parse("#222222").unwrap(), alice, 2);
    canvas.place(canvas.coord(2, 0).unwrap(), Color::parse("#333333").unwrap(), bob, 3);
    // Bob takes over one of Alice's cells.
    canvas.place(canvas.coord(0, 0).unwrap(), Color::parse("#444444").unwrap(), bob, 4);

    let counts = canvas.snapshot().count_by_owner();
    assert_eq!(counts[&alice], 1);
    assert_eq!(counts[&bob], 2);
}

#[test]
fn concurrent_placements_on_distinct_cells_all_land() {
    let canvas = std::sync::Arc::new(CanvasStore::new(10, 10));
    let mut handles = Vec::new();

    for i in 0..100u32 {
        let canvas = std::sync::Arc::clone(&canvas);
        handles.push(std::thread::spawn(move || {
            let coord = canvas.coord(i64::from(i % 10), i64::from(i / 10)).unwrap();
            let result = canvas.place(coord, Color::parse("#ABCDEF").unwrap(), Uuid::new_v4(), i64::from(i));
            assert!(result.is_new_cell);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(canvas.snapshot().len(), 100);
}

#[test]
fn concurrent_placements_on_same_cell_serialize() {
    let canvas = std::sync::Arc::new(CanvasStore::new(3, 3));
    let coord = canvas.coord(1, 1).unwrap();
    let mut handles = Vec::new();

    for i in 0..16i64 {
        let canvas = std::sync::Arc::clone(&canvas);
        handles.push(std::thread::spawn(move || {
            canvas.place(coord, Color::parse("#010101").unwrap(), Uuid::new_v4(), i)
        }));
    }
    let results: Vec<PlaceResult> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Exactly one writer saw an empty cell; every other result names a real
    // previous owner.
    let new_cells = results.iter().filter(|r| r.is_new_cell).count();
    assert_eq!(new_cells, 1);
    assert!(results.iter().all(|r| r.is_new_cell || r.previous_owner.is_some()));
    assert_eq!(canvas.snapshot().len(), 1);
}
