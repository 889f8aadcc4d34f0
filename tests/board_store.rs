mod common;

use mazeroute::{
    board::{
        item::{FixedState, GetId, Item, ItemId},
        undo::{UndoError, UndoableObjects},
        BoardDescription, BoardError, RoutingBoard,
    },
    geometry::{IntBox, IntPoint, ItemShape, Polyline, TileShape},
};

#[test]
fn test_ids_are_assigned_in_order() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);

    let first = common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    let second = common::add_pin(&mut board, IntPoint::new(3000, 1000), 0, 0, 1);

    assert_eq!(first, ItemId(1));
    assert_eq!(second, ItemId(2));
    assert_eq!(board.item_count(), 2);
    assert_eq!(board.search_tree().size(), 2);
}

#[test]
fn test_insert_rejects_bad_items() {
    let mut board = common::make_board(10000, 10000, 2, &["A"]);

    assert_eq!(
        board.insert_trace(
            Polyline::new([IntPoint::new(0, 0), IntPoint::new(1000, 0)]),
            2,
            50,
            1,
            FixedState::NotFixed,
        ),
        Err(BoardError::LayerOutOfRange {
            layer: 2,
            layer_count: 2
        })
    );
    assert_eq!(
        board.insert_trace(
            Polyline::new([IntPoint::new(500, 500), IntPoint::new(500, 500)]),
            0,
            50,
            1,
            FixedState::NotFixed,
        ),
        Err(BoardError::DegenerateTrace)
    );
    assert_eq!(board.item_count(), 0);
}

#[test]
fn test_insert_and_remove_everything() {
    let mut board = common::make_board(20000, 20000, 2, &["A", "B"]);

    let mut ids = vec![];

    for i in 0..10 {
        let net = 1 + i as usize % 2;
        ids.push(common::add_pin(&mut board, IntPoint::new(1000 + i * 1000, 1000), 0, 1, net));
    }

    for i in 0..5 {
        let corners = [(1000 + i * 1000, 5000), (1000 + i * 1000, 9000)];
        ids.push(common::add_trace(&mut board, &corners, i as usize % 2, 2));
    }

    assert_eq!(board.item_count(), 15);

    for id in ids.iter() {
        assert!(board.remove(*id));
    }

    assert!(!board.remove(ids[0]));
    board.compact();

    assert_eq!(board.item_count(), 0);
    assert!(board.search_tree().is_empty());
    assert!(board.nets_with_items().is_empty());
}

#[test]
fn test_store_compacts_to_empty() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    common::add_pin(&mut board, IntPoint::new(3000, 1000), 0, 0, 1);

    let mut store: UndoableObjects<Item> = UndoableObjects::new();

    for item in board.items() {
        store.insert(item.clone());
    }

    let snapshot = store.snapshot();
    assert!(store.remove(ItemId(1)).is_some());
    assert!(store.remove(ItemId(2)).is_some());
    assert!(store.is_empty());

    store.compact();
    assert_eq!(store.node_count(), 2);

    store.release(snapshot);
    store.compact();
    assert_eq!(store.node_count(), 0);
    assert_eq!(
        store.restore(snapshot).err(),
        Some(UndoError::PrunedGeneration(snapshot.0))
    );
}

#[test]
fn test_snapshot_and_restore() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    let pin = common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    let other_pin = common::add_pin(&mut board, IntPoint::new(5000, 1000), 0, 0, 1);

    let fingerprint = board.fingerprint();
    let snapshot = board.snapshot();

    let trace = common::add_trace(&mut board, &[(1000, 1000), (5000, 1000)], 0, 1);
    assert!(board.connected_set(pin, 1).contains(&other_pin));
    board.remove(pin);

    board.restore(snapshot).unwrap();
    board.release(snapshot);

    assert_eq!(board.fingerprint(), fingerprint);
    assert!(board.contains(pin));
    assert!(!board.contains(trace));
    assert_eq!(board.search_tree().size(), 2);
    assert!(!board.connected_set(pin, 1).contains(&other_pin));
    assert_eq!(board.net_components(1).len(), 2);
}

#[test]
fn test_restore_past_rolled_back_snapshot() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);

    let before = board.snapshot();
    let trace = common::add_trace(&mut board, &[(1000, 1000), (5000, 1000)], 0, 1);
    let after = board.snapshot();

    board.restore(before).unwrap();
    assert!(!board.contains(trace));

    // The trace is gone for good; the later snapshot cannot bring it back.
    assert_eq!(
        board.restore(after).err(),
        Some(BoardError::Undo(UndoError::PrunedGeneration(after.0)))
    );
    assert!(!board.contains(trace));
    assert_eq!(board.item_count(), 1);

    board.release(after);
    board.release(before);
    board.compact();
    assert_eq!(board.stored_item_count(), 1);
}

#[test]
fn test_plane_flag_follows_plane_items() {
    let mut board = common::make_board(10000, 10000, 2, &["GND"]);
    assert!(!board.rules().nets.contains_plane(1));

    let plane = common::add_plane(&mut board, IntBox::from_coords(0, 0, 10000, 10000), 1, 1);
    assert!(board.rules().nets.contains_plane(1));

    board.remove(plane);
    assert!(!board.rules().nets.contains_plane(1));

    let snapshot = board.snapshot();
    common::add_plane(&mut board, IntBox::from_coords(0, 0, 5000, 5000), 0, 1);
    assert!(board.rules().nets.contains_plane(1));

    board.restore(snapshot).unwrap();
    board.release(snapshot);
    assert!(!board.rules().nets.contains_plane(1));
}

#[test]
fn test_reader_keeps_its_view() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    let pin = common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    common::add_pin(&mut board, IntPoint::new(3000, 1000), 0, 0, 1);

    let mut cursor = board.start_read();

    board.remove(pin);
    common::add_pin(&mut board, IntPoint::new(5000, 1000), 0, 0, 1);

    let mut seen = vec![];

    while let Some(item) = board.read_next(&mut cursor) {
        seen.push(item.id());
    }

    assert_eq!(seen, vec![ItemId(1), ItemId(2)]);
}

#[test]
fn test_overlapping() {
    let mut board = common::make_board(10000, 10000, 2, &["A", "B"]);
    let pin = common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    let trace = common::add_trace(&mut board, &[(1000, 1200), (4000, 1200)], 0, 2);

    let query = ItemShape::Tile(TileShape::Box(IntBox::from_coords(900, 900, 1100, 1100)));
    assert_eq!(board.overlapping(&query, 0).into_iter().collect::<Vec<_>>(), vec![pin]);
    assert!(board.overlapping(&query, 1).is_empty());

    // The trace's edge is 50 from the pin, closer than the clearance of 100.
    let near = board.overlapping_with_clearance(&query, 0, &[1], 1);
    assert!(near.contains(&trace));
    assert!(!near.contains(&pin));
}

#[test]
fn test_description_survives_json() {
    let mut board = common::make_board(10000, 10000, 2, &["A", "B"]);
    common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 1, 1);
    common::add_pin(&mut board, IntPoint::new(5000, 1000), 0, 1, 2);
    common::add_trace(&mut board, &[(1000, 1000), (3000, 3000)], 1, 1);

    let json = serde_json::to_string(&board.to_description()).unwrap();
    let description: BoardDescription = serde_json::from_str(&json).unwrap();
    let loaded = RoutingBoard::from_description(description).unwrap();

    assert_eq!(loaded.fingerprint(), board.fingerprint());
    assert_eq!(loaded.state_hash(), board.state_hash());
    assert_eq!(loaded.rules().nets.net_no("B"), Some(2));
    assert_eq!(loaded.layer_no("L2"), Some(1));
}

#[test]
fn test_description_without_net_class() {
    let board = common::make_board(10000, 10000, 1, &["A"]);
    let mut description = board.to_description();
    description.net_classes.clear();

    assert_eq!(
        RoutingBoard::from_description(description).err(),
        Some(BoardError::NoNetClass)
    );
}
