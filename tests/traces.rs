mod common;

use mazeroute::{
    board::{
        item::{FixedState, ItemKind},
        trace::{diff_traces, trace_polyline, StopConnectionOption},
        RoutingBoard,
    },
    geometry::{IntBox, IntPoint, Polyline},
};

fn corners_of(board: &RoutingBoard, kind: ItemKind) -> Vec<Vec<IntPoint>> {
    let mut corners: Vec<Vec<IntPoint>> = common::items_of_net(board, 1, kind)
        .iter()
        .filter_map(|item| item.as_trace())
        .map(|trace| trace.polyline.corners().to_vec())
        .collect();
    corners.sort();
    corners
}

#[test]
fn test_split_at_corner() {
    let mut board = common::make_board_in(
        IntBox::from_coords(1_000_000, -1_100_000, 1_400_000, -900_000),
        2,
        &["A"],
    );
    let trace = common::add_trace(
        &mut board,
        &[(1291423, -987076), (1243227, -964893), (1241414, -964893)],
        0,
        1,
    );
    board
        .insert_via(IntPoint::new(1243227, -964893), 0, 1, 1, FixedState::NotFixed)
        .unwrap();

    let pieces = board.split_trace(trace);

    assert_eq!(pieces.len(), 2);
    assert!(!board.contains(trace));
    assert_eq!(
        corners_of(&board, ItemKind::Trace),
        vec![
            vec![IntPoint::new(1243227, -964893), IntPoint::new(1241414, -964893)],
            vec![IntPoint::new(1291423, -987076), IntPoint::new(1243227, -964893)],
        ]
    );
}

#[test]
fn test_split_after_combine_keeps_start() {
    let mut board = common::make_board_in(
        IntBox::from_coords(1_000_000, -1_100_000, 1_400_000, -900_000),
        1,
        &["A"],
    );
    let start = IntPoint::new(1291423, -987076);
    let joint = IntPoint::new(1243227, -964893);
    let end = IntPoint::new(1241414, -964893);

    let first = common::add_trace(
        &mut board,
        &[(1291423, -987076), (1270000, -975000), (1250000, -970000), (1243227, -964893)],
        0,
        1,
    );
    let second = common::add_trace(&mut board, &[(1243227, -964893), (1241414, -964893)], 0, 1);

    let combined = board.combine_trace(second).unwrap();
    assert!(!board.contains(first));
    assert!(!board.contains(second));

    let trace = board.item(combined).unwrap().as_trace().unwrap().clone();
    let ends = [trace.first_corner(), trace.last_corner()];
    assert!(ends.contains(&start));
    assert!(ends.contains(&end));

    common::add_trace(&mut board, &[(1243227, -964893), (1242000, -960000), (1241171, -952775)], 0, 1);

    let pieces = board.split_trace(combined);
    assert_eq!(pieces.len(), 2);

    let piece_ends: Vec<[IntPoint; 2]> = pieces
        .iter()
        .filter_map(|id| board.item(*id).and_then(|item| item.as_trace()))
        .map(|piece| [piece.first_corner(), piece.last_corner()])
        .collect();

    // Splitting at the joint must not lose the far end of the combined trace.
    assert!(piece_ends.iter().any(|ends| ends.contains(&start) && ends.contains(&joint)));
    assert!(piece_ends.iter().any(|ends| ends.contains(&end) && ends.contains(&joint)));
}

#[test]
fn test_split_where_trace_ends() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    let trace = common::add_trace(&mut board, &[(1000, 1000), (5000, 1000)], 0, 1);
    common::add_trace(&mut board, &[(3000, 1000), (3000, 4000)], 0, 1);

    assert_eq!(board.split_trace(trace).len(), 2);
    assert_eq!(
        corners_of(&board, ItemKind::Trace),
        vec![
            vec![IntPoint::new(1000, 1000), IntPoint::new(3000, 1000)],
            vec![IntPoint::new(3000, 1000), IntPoint::new(3000, 4000)],
            vec![IntPoint::new(3000, 1000), IntPoint::new(5000, 1000)],
        ]
    );
}

#[test]
fn test_nothing_to_split() {
    let mut board = common::make_board(10000, 10000, 1, &["A", "B"]);
    let trace = common::add_trace(&mut board, &[(1000, 1000), (5000, 1000)], 0, 1);
    common::add_trace(&mut board, &[(3000, 1000), (3000, 4000)], 0, 2);

    assert_eq!(board.split_trace(trace), vec![trace]);
    assert!(board.contains(trace));
}

#[test]
fn test_combine() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    let first = common::add_trace(&mut board, &[(1000, 1000), (2000, 1000)], 0, 1);
    common::add_trace(&mut board, &[(2000, 1000), (2000, 2000)], 0, 1);

    assert!(board.combine_trace(first).is_some());
    assert_eq!(
        corners_of(&board, ItemKind::Trace),
        vec![vec![
            IntPoint::new(1000, 1000),
            IntPoint::new(2000, 1000),
            IntPoint::new(2000, 2000),
        ]]
    );
}

#[test]
fn test_no_combine_at_junction() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    let first = common::add_trace(&mut board, &[(1000, 1000), (2000, 1000)], 0, 1);
    common::add_trace(&mut board, &[(2000, 1000), (2000, 2000)], 0, 1);
    common::add_pin(&mut board, IntPoint::new(2000, 1000), 0, 0, 1);

    assert_eq!(board.combine_trace(first), None);
    assert_eq!(corners_of(&board, ItemKind::Trace).len(), 2);
}

#[test]
fn test_cycle() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    common::add_pin(&mut board, IntPoint::new(5000, 1000), 0, 0, 1);
    let direct = common::add_trace(&mut board, &[(1000, 1000), (5000, 1000)], 0, 1);
    let detour = common::add_trace(
        &mut board,
        &[(1000, 1000), (1000, 3000), (5000, 3000), (5000, 1000)],
        0,
        1,
    );

    assert!(board.is_cycle(detour));
    assert!(board.is_cycle(direct));

    board.remove(direct);
    assert!(!board.is_cycle(detour));
}

#[test]
fn test_remove_dangling_trace() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    let pin = common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    let dangling = common::add_trace(&mut board, &[(1000, 1000), (3000, 3000)], 0, 1);
    let fixed = board
        .insert_trace(
            Polyline::new([IntPoint::new(1000, 1000), IntPoint::new(1000, 4000)]),
            0,
            common::TRACE_HALF_WIDTH,
            1,
            FixedState::UserFixed,
        )
        .unwrap();

    let before = board.trace_ids();

    assert!(board.remove_trace_tails(None, StopConnectionOption::None));
    assert!(!board.contains(dangling));
    assert!(board.contains(fixed));
    assert!(board.contains(pin));
    assert_eq!(diff_traces(&before, &board), 1);

    assert!(!board.remove_trace_tails(None, StopConnectionOption::None));
}

#[test]
fn test_fanout_via_is_kept() {
    let mut board = common::make_board(10000, 10000, 2, &["A"]);
    common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    common::add_trace(&mut board, &[(1000, 1000), (3000, 1000)], 0, 1);
    board
        .insert_via(IntPoint::new(3000, 1000), 0, 1, 1, FixedState::NotFixed)
        .unwrap();

    assert!(!board.remove_trace_tails(None, StopConnectionOption::FanoutVia));
    assert_eq!(board.item_count(), 3);

    assert!(board.remove_trace_tails(None, StopConnectionOption::None));
    assert_eq!(board.item_count(), 1);
}

#[test]
fn test_tails_of_other_nets_stay() {
    let mut board = common::make_board(10000, 10000, 1, &["A", "B"]);
    let tail_a = common::add_trace(&mut board, &[(1000, 1000), (3000, 1000)], 0, 1);
    let tail_b = common::add_trace(&mut board, &[(1000, 5000), (3000, 5000)], 0, 2);

    assert!(board.remove_trace_tails(Some(2), StopConnectionOption::None));
    assert!(board.contains(tail_a));
    assert!(!board.contains(tail_b));
}

#[test]
fn test_normalize_joins_and_splits() {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    common::add_pin(&mut board, IntPoint::new(3000, 1000), 0, 0, 1);
    common::add_trace(&mut board, &[(1000, 1000), (2000, 1000)], 0, 1);
    common::add_trace(&mut board, &[(2000, 1000), (3000, 1000), (3000, 3000)], 0, 1);

    let traces = board.normalize_traces(1);

    assert_eq!(traces.len(), 2);
    assert_eq!(
        corners_of(&board, ItemKind::Trace),
        vec![
            vec![IntPoint::new(1000, 1000), IntPoint::new(3000, 1000)],
            vec![IntPoint::new(3000, 1000), IntPoint::new(3000, 3000)],
        ]
    );
}

#[test]
fn test_trace_polyline() {
    assert!(trace_polyline([IntPoint::new(5, 5), IntPoint::new(5, 5)]).is_none());

    let polyline = trace_polyline([
        IntPoint::new(0, 0),
        IntPoint::new(1000, 0),
        IntPoint::new(2000, 0),
        IntPoint::new(2000, 1000),
    ])
    .unwrap();
    assert_eq!(
        polyline.corners(),
        &[
            IntPoint::new(0, 0),
            IntPoint::new(2000, 0),
            IntPoint::new(2000, 1000)
        ]
    );
}
