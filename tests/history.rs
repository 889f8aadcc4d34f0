mod common;

use mazeroute::{
    autoroute::history::BoardHistory,
    board::RoutingBoard,
    geometry::IntPoint,
    settings::ScoringSettings,
};

fn unrouted_board() -> RoutingBoard {
    let mut board = common::make_board(10000, 10000, 1, &["A"]);
    common::add_pin(&mut board, IntPoint::new(1000, 1000), 0, 0, 1);
    common::add_pin(&mut board, IntPoint::new(3000, 1000), 0, 0, 1);
    board
}

fn routed_board() -> RoutingBoard {
    let mut board = unrouted_board();
    common::add_trace(&mut board, &[(1000, 1000), (3000, 1000)], 0, 1);
    board
}

#[test]
fn test_same_board_is_added_once() {
    let mut history = BoardHistory::new(ScoringSettings::default(), 20);
    let board = unrouted_board();

    assert!(history.add(&board));
    assert!(!history.add(&board.clone()));
    assert!(!history.add(&unrouted_board()));
    assert_eq!(history.size(), 1);

    let restored = history.restore_best_board().unwrap();
    assert_eq!(restored.state_hash(), board.state_hash());
    assert_eq!(restored.fingerprint(), board.fingerprint());
}

#[test]
fn test_best_board_ranks_first() {
    let mut history = BoardHistory::new(ScoringSettings::default(), 20);
    let unrouted = unrouted_board();
    let routed = routed_board();

    history.add(&unrouted);
    history.add(&routed);

    assert_eq!(history.rank(&routed), Some(1));
    assert_eq!(history.rank(&unrouted), Some(2));
    assert!(history.max_score() > 900.0);
    assert_eq!(
        history.restore_best_board().unwrap().fingerprint(),
        routed.fingerprint()
    );
}

#[test]
fn test_capacity_drops_the_worst() {
    let mut history = BoardHistory::new(ScoringSettings::default(), 1);

    history.add(&unrouted_board());
    history.add(&routed_board());

    assert_eq!(history.size(), 1);
    assert!(history.contains(&routed_board()));
    assert!(!history.contains(&unrouted_board()));
}

#[test]
fn test_restore_count_limit() {
    let mut history = BoardHistory::new(ScoringSettings::default(), 20);
    let unrouted = unrouted_board();
    let routed = routed_board();

    history.add(&unrouted);
    history.add(&routed);

    for _ in 0..2 {
        assert_eq!(
            history.restore_board(1).unwrap().fingerprint(),
            routed.fingerprint()
        );
    }

    assert_eq!(
        history.restore_board(1).unwrap().fingerprint(),
        unrouted.fingerprint()
    );
    assert_eq!(
        history.restore_board(0).unwrap().fingerprint(),
        routed.fingerprint()
    );
}

#[test]
fn test_restored_board_is_a_copy() {
    let mut history = BoardHistory::new(ScoringSettings::default(), 20);
    let board = routed_board();
    history.add(&board);

    let mut restored = history.restore_best_board().unwrap();
    restored.remove(restored.trace_ids().into_iter().next().unwrap());

    assert!(history.contains(&board));
    assert!(!history.contains(&restored));
}

#[test]
fn test_remove_and_clear() {
    let mut history = BoardHistory::new(ScoringSettings::default(), 20);

    assert!(history.is_empty());
    assert_eq!(history.max_score(), 0.0);
    assert!(history.restore_best_board().is_none());

    history.add(&unrouted_board());
    history.add(&routed_board());

    assert!(history.remove(&routed_board()));
    assert!(!history.remove(&routed_board()));
    assert_eq!(history.size(), 1);

    history.clear();
    assert!(history.is_empty());
    assert_eq!(history.capacity(), 20);
}
