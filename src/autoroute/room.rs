//! Decomposition of the free space around a connection into expansion rooms.
//!
//! On every active layer the window is cut into a non-uniform grid along the clearance
//! envelopes of the obstacles. Each grid cell is exact-tested against the obstacles it may
//! touch and is then free, blocked, or passable only after ripping up some items. Runs of
//! equal cells are merged into rectangular rooms, and rooms sharing a boundary of positive
//! length are joined by a door at the middle of that boundary.
//!
//! A trace centerline may run straight between any two points of one room, so the rooms
//! and doors form a graph whose paths are valid trace routes.

use std::collections::{BTreeSet, HashMap};

use log::trace;
use petgraph::graph::{NodeIndex, UnGraph};
use rstar::{primitives::GeomWithData, primitives::Rectangle, RTree, AABB};

use crate::{
    autoroute::control::AutorouteControl,
    board::{
        item::{GetLayers, Item, ItemId},
        search_tree::TreeEntry,
        RoutingBoard,
    },
    geometry::{IntBox, IntOctagon, IntPoint, ItemShape, TileShape, TileShapeTrait},
    graph::{GenericIndex, GetIndex},
    rules::AccessRules,
};

pub type RoomIndex = GenericIndex<ExpansionRoom>;

#[derive(Debug, Clone)]
pub struct ExpansionRoom {
    pub layer: usize,
    pub bbox: IntBox,
    /// Items a trace through this room would violate; they must be ripped up first.
    pub ripup: BTreeSet<ItemId>,
}

impl ExpansionRoom {
    pub fn is_free(&self) -> bool {
        self.ripup.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MazeNode {
    pub point: IntPoint,
    pub layer: usize,
    pub is_start: bool,
    pub is_destination: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MazeEdge {
    /// A straight trace run inside one room.
    Room { room: RoomIndex, cost: f64 },
    /// A via between two layers at one point.
    Drill { cost: f64 },
}

/// Points and plane areas a connection starts or ends at.
#[derive(Debug, Clone, Default)]
pub struct Terminals {
    pub points: Vec<(IntPoint, usize)>,
    pub areas: Vec<(TileShape, usize)>,
}

impl Terminals {
    /// Connection points of `items` on the active layers of `control`.
    pub fn of_items(
        board: &RoutingBoard,
        items: &BTreeSet<ItemId>,
        control: &AutorouteControl,
    ) -> Self {
        let mut terminals = Terminals::default();

        for item in items.iter().filter_map(|id| board.item(*id)) {
            for layer in item.first_layer()..=item.last_layer() {
                if !control.layer_active.get(layer).copied().unwrap_or(false) {
                    continue;
                }

                match item {
                    Item::ConductionArea(area) => terminals.areas.push((area.shape.clone(), layer)),
                    _ => terminals.points.extend(
                        item.connection_points(layer)
                            .into_iter()
                            .map(|point| (point, layer)),
                    ),
                }
            }
        }

        terminals
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.areas.is_empty()
    }

    pub fn bounding_box(&self) -> Option<IntBox> {
        self.points
            .iter()
            .map(|(point, _)| IntBox::from_point(*point))
            .chain(self.areas.iter().map(|(shape, _)| shape.bounding_box()))
            .reduce(|bbox, other| bbox.union(&other))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CellState {
    Free,
    Blocked,
    Ripup(BTreeSet<ItemId>),
}

type RoomRect = GeomWithData<Rectangle<[i64; 2]>, usize>;

/// The room graph of one connection search. Dropped once the search is over.
#[derive(Debug)]
pub struct ExpansionGraph {
    pub graph: UnGraph<MazeNode, MazeEdge>,
    pub rooms: Vec<ExpansionRoom>,
    /// Ripup cost of every item some room would rip up.
    pub ripup_costs: HashMap<ItemId, f64>,
}

struct GraphBuilder<'a> {
    board: &'a RoutingBoard,
    control: &'a AutorouteControl,
    graph: UnGraph<MazeNode, MazeEdge>,
    rooms: Vec<ExpansionRoom>,
    room_nodes: Vec<Vec<NodeIndex>>,
    room_trees: Vec<RTree<RoomRect>>,
    nodes: HashMap<(IntPoint, usize), NodeIndex>,
    ripup_costs: HashMap<ItemId, f64>,
}

impl ExpansionGraph {
    pub fn build(
        board: &RoutingBoard,
        control: &AutorouteControl,
        window: &IntBox,
        start: &Terminals,
        destination: &Terminals,
    ) -> Self {
        let mut builder = GraphBuilder {
            board,
            control,
            graph: UnGraph::default(),
            rooms: vec![],
            room_nodes: vec![],
            room_trees: (0..board.layer_count()).map(|_| RTree::new()).collect(),
            nodes: HashMap::new(),
            ripup_costs: HashMap::new(),
        };

        for layer in 0..board.layer_count() {
            if control.layer_active.get(layer).copied().unwrap_or(false) {
                builder.build_layer(layer, window);
            }
        }

        builder.add_doors();
        builder.add_terminals(start, true);
        builder.add_terminals(destination, false);

        if control.vias_allowed {
            builder.add_drills();
        }

        builder.add_room_edges();

        trace!(
            "expansion graph: {} rooms, {} nodes, {} edges",
            builder.rooms.len(),
            builder.graph.node_count(),
            builder.graph.edge_count()
        );

        Self {
            graph: builder.graph,
            rooms: builder.rooms,
            ripup_costs: builder.ripup_costs,
        }
    }

    pub fn room(&self, room: RoomIndex) -> &ExpansionRoom {
        &self.rooms[room.index()]
    }
}

impl<'a> GraphBuilder<'a> {
    fn obstacle_clearance(&self, entry: &TreeEntry, layer: usize) -> i64 {
        self.control.trace_half_width[layer]
            + self.board.rules().clearance(
                self.control.trace_clearance_class,
                entry.clearance_class,
                layer,
            )
    }

    fn entry_ripup_cost(&self, entry: &TreeEntry) -> f64 {
        let cost_factor = match self.board.item(entry.item) {
            Some(Item::Trace(trace)) => trace.half_width.max(1) as f64,
            Some(Item::Via(via)) => 0.5 * via.radius.max(1) as f64,
            _ => 1.0,
        };

        (self.control.ripup_costs * cost_factor).max(1.0)
    }

    fn build_layer(&mut self, layer: usize, window: &IntBox) {
        let board = self.board;
        let half_width = self.control.trace_half_width[layer];
        let Some(bounds) = board
            .bounding_box()
            .offset(-half_width)
            .intersection(window)
        else {
            return;
        };

        let largest_clearance = board
            .rules()
            .largest_clearance(self.control.trace_clearance_class, layer);
        let net_no = self.control.net_no;

        let obstacles: Vec<(&TreeEntry, i64, IntBox)> = board
            .search_tree()
            .entries_in_box(&bounds.offset(half_width + largest_clearance), layer)
            .filter(|entry| !entry.nets.contains(&net_no))
            .filter_map(|entry| {
                let required = self.obstacle_clearance(entry, layer);
                let envelope = entry.shape.bounding_box().offset(required);
                envelope
                    .intersection(&bounds)
                    .map(|clipped| (entry, required, clipped))
            })
            .collect();

        let mut xs: Vec<i64> = vec![bounds.ll.x, bounds.ur.x];
        let mut ys: Vec<i64> = vec![bounds.ll.y, bounds.ur.y];

        for (_, _, envelope) in obstacles.iter() {
            xs.extend([envelope.ll.x, envelope.ur.x]);
            ys.extend([envelope.ll.y, envelope.ur.y]);
        }

        xs.sort_unstable();
        xs.dedup();
        ys.sort_unstable();
        ys.dedup();

        if xs.len() < 2 || ys.len() < 2 {
            return;
        }

        let column_count = xs.len() - 1;
        let row_count = ys.len() - 1;
        let mut cells = vec![CellState::Free; column_count * row_count];

        for (entry, required, envelope) in obstacles.iter() {
            let ripupable = self.control.ripup_allowed && entry.is_ripupable();

            if ripupable {
                let cost = self.entry_ripup_cost(entry);
                self.ripup_costs.insert(entry.item, cost);
            }

            let (Ok(first_column), Ok(end_column), Ok(first_row), Ok(end_row)) = (
                xs.binary_search(&envelope.ll.x),
                xs.binary_search(&envelope.ur.x),
                ys.binary_search(&envelope.ll.y),
                ys.binary_search(&envelope.ur.y),
            ) else {
                continue;
            };

            for row in first_row..end_row {
                for column in first_column..end_column {
                    let cell = IntBox::from_coords(xs[column], ys[row], xs[column + 1], ys[row + 1]);
                    let gap = ItemShape::Tile(TileShape::Box(cell)).distance(&entry.shape);

                    if gap >= *required as f64 {
                        continue;
                    }

                    let state = &mut cells[row * column_count + column];

                    match state {
                        CellState::Blocked => (),
                        CellState::Free if ripupable => {
                            *state = CellState::Ripup(BTreeSet::from([entry.item]))
                        }
                        CellState::Ripup(items) if ripupable => {
                            items.insert(entry.item);
                        }
                        _ => *state = CellState::Blocked,
                    }
                }
            }
        }

        self.merge_cells(layer, &xs, &ys, &cells);
    }

    /// Merges runs of equal cells within a row, then stacks runs spanning the same columns
    /// in consecutive rows.
    fn merge_cells(&mut self, layer: usize, xs: &[i64], ys: &[i64], cells: &[CellState]) {
        let column_count = xs.len() - 1;
        let mut open: HashMap<(usize, usize), usize> = HashMap::new();

        for row in 0..ys.len() - 1 {
            let mut next_open = HashMap::new();
            let mut column = 0;

            while column < column_count {
                let state = &cells[row * column_count + column];
                let mut end = column + 1;

                while end < column_count && cells[row * column_count + end] == *state {
                    end += 1;
                }

                if *state != CellState::Blocked {
                    let ripup = match state {
                        CellState::Ripup(items) => items.clone(),
                        _ => BTreeSet::new(),
                    };

                    let room = match open.get(&(column, end)) {
                        Some(&room) if self.rooms[room].ripup == ripup => {
                            self.rooms[room].bbox.ur.y = ys[row + 1];
                            room
                        }
                        _ => {
                            self.rooms.push(ExpansionRoom {
                                layer,
                                bbox: IntBox::from_coords(xs[column], ys[row], xs[end], ys[row + 1]),
                                ripup,
                            });
                            self.room_nodes.push(vec![]);
                            self.rooms.len() - 1
                        }
                    };

                    next_open.insert((column, end), room);
                }

                column = end;
            }

            open = next_open;
        }

        let tree = &mut self.room_trees[layer];

        for (index, room) in self.rooms.iter().enumerate() {
            if room.layer == layer {
                tree.insert(RoomRect::new(
                    Rectangle::from_corners(
                        [room.bbox.ll.x, room.bbox.ll.y],
                        [room.bbox.ur.x, room.bbox.ur.y],
                    ),
                    index,
                ));
            }
        }
    }

    fn rooms_at(&self, point: IntPoint, layer: usize) -> Vec<usize> {
        let Some(tree) = self.room_trees.get(layer) else {
            return vec![];
        };

        tree.locate_in_envelope_intersecting(&AABB::from_point([point.x, point.y]))
            .map(|rect| rect.data)
            .collect()
    }

    fn node(&mut self, point: IntPoint, layer: usize) -> NodeIndex {
        *self.nodes.entry((point, layer)).or_insert_with(|| {
            self.graph.add_node(MazeNode {
                point,
                layer,
                is_start: false,
                is_destination: false,
            })
        })
    }

    fn attach(&mut self, room: usize, node: NodeIndex) {
        if !self.room_nodes[room].contains(&node) {
            self.room_nodes[room].push(node);
        }
    }

    fn add_doors(&mut self) {
        for room in 0..self.rooms.len() {
            let layer = self.rooms[room].layer;
            let bbox = self.rooms[room].bbox;
            let neighbours: Vec<usize> = self.room_trees[layer]
                .locate_in_envelope_intersecting(&AABB::from_corners(
                    [bbox.ll.x, bbox.ll.y],
                    [bbox.ur.x, bbox.ur.y],
                ))
                .map(|rect| rect.data)
                .filter(|other| *other > room)
                .collect();

            for other in neighbours {
                let Some(shared) = bbox.intersection(&self.rooms[other].bbox) else {
                    continue;
                };

                // Rooms touching only at a corner have no door.
                if (shared.width() == 0) == (shared.height() == 0) {
                    continue;
                }

                let door = self.node(shared.center(), layer);
                self.attach(room, door);
                self.attach(other, door);
            }
        }
    }

    fn add_terminals(&mut self, terminals: &Terminals, is_start: bool) {
        let mut nodes = vec![];

        for (point, layer) in terminals.points.iter() {
            for room in self.rooms_at(*point, *layer) {
                let node = self.node(*point, *layer);
                self.attach(room, node);
                nodes.push(node);
            }
        }

        for (shape, layer) in terminals.areas.iter() {
            let rooms: Vec<usize> = (0..self.rooms.len())
                .filter(|room| self.rooms[*room].layer == *layer)
                .filter(|room| self.rooms[*room].is_free())
                .filter(|room| shape.contains(self.rooms[*room].bbox.center()))
                .collect();

            for room in rooms {
                let node = self.node(self.rooms[room].bbox.center(), *layer);
                self.attach(room, node);
                nodes.push(node);
            }
        }

        for node in nodes {
            let weight = &mut self.graph[node];

            if is_start {
                weight.is_start = true;
            } else {
                weight.is_destination = true;
            }
        }
    }

    fn is_drill_clear(&self, center: IntPoint, layer: usize) -> bool {
        let shape = ItemShape::Tile(TileShape::Octagon(IntOctagon::around(
            center,
            self.control.via_radius,
        )));

        self.board
            .overlapping_with_clearance(
                &shape,
                layer,
                &[self.control.net_no],
                self.control.via_clearance_class,
            )
            .is_empty()
    }

    /// Via candidates at the centers of free rooms.
    fn add_drills(&mut self) {
        let via_bounds = self.board.bounding_box().offset(-self.control.via_radius);
        let layer_count = self.board.layer_count();

        let candidates: BTreeSet<IntPoint> = self
            .rooms
            .iter()
            .filter(|room| room.is_free())
            .map(|room| room.bbox.center())
            .filter(|center| via_bounds.contains(*center))
            .collect();

        for center in candidates {
            let clear: Vec<bool> = (0..layer_count)
                .map(|layer| self.is_drill_clear(center, layer))
                .collect();
            let reachable: Vec<(usize, Vec<usize>)> = (0..layer_count)
                .filter(|layer| self.control.layer_active[*layer] && clear[*layer])
                .map(|layer| {
                    let rooms: Vec<usize> = self
                        .rooms_at(center, layer)
                        .into_iter()
                        .filter(|room| self.rooms[*room].is_free())
                        .collect();
                    (layer, rooms)
                })
                .filter(|(_, rooms)| !rooms.is_empty())
                .collect();

            if reachable.len() < 2 {
                continue;
            }

            let mut layer_nodes = vec![];

            for (layer, rooms) in reachable {
                let node = self.node(center, layer);

                for room in rooms {
                    self.attach(room, node);
                }

                layer_nodes.push((layer, node));
            }

            for (i, (layer, node)) in layer_nodes.iter().enumerate() {
                for (other_layer, other_node) in layer_nodes.iter().skip(i + 1) {
                    if clear[*layer..=*other_layer].iter().all(|clear| *clear) {
                        self.graph.add_edge(
                            *node,
                            *other_node,
                            MazeEdge::Drill {
                                cost: self.control.via_cost,
                            },
                        );
                    }
                }
            }
        }
    }

    fn add_room_edges(&mut self) {
        for room in 0..self.rooms.len() {
            let layer = self.rooms[room].layer;
            let factor = self.control.trace_costs[layer];
            let nodes = self.room_nodes[room].clone();

            for (i, node) in nodes.iter().enumerate() {
                for other in nodes.iter().skip(i + 1) {
                    let from = self.graph[*node].point;
                    let to = self.graph[*other].point;
                    let cost = (to.x - from.x).abs() as f64 * factor.horizontal
                        + (to.y - from.y).abs() as f64 * factor.vertical;

                    self.graph.add_edge(
                        *node,
                        *other,
                        MazeEdge::Room {
                            room: RoomIndex::new(room),
                            cost,
                        },
                    );
                }
            }
        }
    }
}
