#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};

use petgraph::unionfind::UnionFind;
use mazeroute::{
    board::{
        item::{ConductionArea, FixedState, GetId, HasNet, Item, ItemId, ItemKind, Keepout, Pin},
        Layer, RoutingBoard,
    },
    geometry::{IntBox, IntPoint, Polyline, TileShape},
    rules::{BoardRules, ClearanceMatrix, NetClass, Nets},
};

pub const CLEARANCE: i64 = 100;
pub const TRACE_HALF_WIDTH: i64 = 50;
pub const VIA_RADIUS: i64 = 150;
pub const PIN_HALF_SIZE: i64 = 100;

pub fn net_class() -> NetClass {
    NetClass {
        name: "default".to_string(),
        trace_half_width: TRACE_HALF_WIDTH,
        trace_clearance_class: 1,
        via_radius: VIA_RADIUS,
        via_clearance_class: 1,
    }
}

/// Empty board of `width` by `height` with the given signal layers and nets, numbered from
/// 1 in order.
pub fn make_board(width: i64, height: i64, layer_count: usize, nets: &[&str]) -> RoutingBoard {
    make_board_in(IntBox::from_coords(0, 0, width, height), layer_count, nets)
}

pub fn make_board_in(bounding_box: IntBox, layer_count: usize, nets: &[&str]) -> RoutingBoard {
    let layers = (0..layer_count)
        .map(|layer| Layer {
            name: format!("L{}", layer + 1),
            is_signal: true,
        })
        .collect();

    let mut board_nets = Nets::new();

    for name in nets {
        board_nets.add(name, 0);
    }

    let rules = BoardRules::new(
        ClearanceMatrix::default_instance(layer_count, CLEARANCE),
        board_nets,
        vec![net_class()],
    );

    RoutingBoard::new(bounding_box, layers, rules)
}

pub fn add_pin(
    board: &mut RoutingBoard,
    center: IntPoint,
    first_layer: usize,
    last_layer: usize,
    net: usize,
) -> ItemId {
    board
        .insert(Item::Pin(Pin {
            id: ItemId::default(),
            center,
            shape: TileShape::Box(IntBox::from_coords(
                center.x - PIN_HALF_SIZE,
                center.y - PIN_HALF_SIZE,
                center.x + PIN_HALF_SIZE,
                center.y + PIN_HALF_SIZE,
            )),
            first_layer,
            last_layer,
            nets: vec![net],
            clearance_class: 1,
            fixed: FixedState::SystemFixed,
        }))
        .unwrap()
}

pub fn add_trace(
    board: &mut RoutingBoard,
    corners: &[(i64, i64)],
    layer: usize,
    net: usize,
) -> ItemId {
    board
        .insert_trace(
            Polyline::new(corners.iter().map(|(x, y)| IntPoint::new(*x, *y))),
            layer,
            TRACE_HALF_WIDTH,
            net,
            FixedState::NotFixed,
        )
        .unwrap()
}

pub fn add_keepout(board: &mut RoutingBoard, bbox: IntBox, first_layer: usize, last_layer: usize) {
    board
        .insert(Item::Keepout(Keepout {
            id: ItemId::default(),
            shape: TileShape::Box(bbox),
            first_layer,
            last_layer,
            clearance_class: 1,
            fixed: FixedState::UserFixed,
        }))
        .unwrap();
}

pub fn add_plane(board: &mut RoutingBoard, bbox: IntBox, layer: usize, net: usize) -> ItemId {
    board
        .insert(Item::ConductionArea(ConductionArea {
            id: ItemId::default(),
            shape: TileShape::Box(bbox),
            layer,
            nets: vec![net],
            clearance_class: 1,
            fixed: FixedState::UserFixed,
        }))
        .unwrap()
}

/// Asserts that the pins of every net are connected to each other, judging by shape
/// contact alone.
pub fn assert_nets_connected(board: &RoutingBoard) {
    let ids: Vec<ItemId> = board.items().map(|item| item.id()).collect();
    let index_of: HashMap<ItemId, usize> =
        ids.iter().enumerate().map(|(index, id)| (*id, index)).collect();
    let mut unionfind = UnionFind::new(ids.len());

    for net in board.nets_with_items() {
        for id in board.net_items(net) {
            for neighbour in board.net_neighbours(id, net) {
                unionfind.union(index_of[&id], index_of[&neighbour]);
            }
        }
    }

    for net in board.nets_with_items() {
        let roots: BTreeSet<usize> = board
            .net_items(net)
            .filter(|id| {
                board
                    .item(*id)
                    .map_or(false, |item| item.kind() == ItemKind::Pin)
            })
            .map(|id| unionfind.find(index_of[&id]))
            .collect();

        dbg!(net, &roots);
        assert!(roots.len() <= 1);
    }
}

pub fn assert_no_clearance_violations(board: &RoutingBoard) {
    let violations = board.clearance_violations();
    dbg!(&violations);
    assert!(violations.is_empty());
}

pub fn items_of_net(board: &RoutingBoard, net: usize, kind: ItemKind) -> Vec<Item> {
    board
        .items()
        .filter(|item| item.kind() == kind && item.contains_net(net))
        .cloned()
        .collect()
}
