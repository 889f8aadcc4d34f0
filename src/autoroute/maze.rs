//! Cost-driven frontier search over an expansion graph.

use std::{cmp::Ordering, collections::BinaryHeap};

use log::{debug, trace};
use petgraph::{
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
};

use crate::{
    autoroute::{
        control::AutorouteControl,
        room::{ExpansionGraph, MazeEdge, RoomIndex},
        stop::StopHandle,
    },
    board::item::ItemId,
};

/// Frontier entry. `BinaryHeap` pops the lowest cost first and, among equal costs, the
/// entry pushed first, so identical inputs always settle nodes in the same order.
#[derive(Debug, Clone, Copy)]
pub struct MinScored<T> {
    pub cost: f64,
    pub sequence: u64,
    pub item: T,
}

impl<T> PartialEq for MinScored<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for MinScored<T> {}

impl<T> PartialOrd for MinScored<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for MinScored<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Search state of one graph node, reset for every connection search.
#[derive(Debug, Clone, Default)]
pub struct MazeSearchElement {
    pub occupied: bool,
    pub cost: f64,
    /// Node and edge this node was reached through.
    pub backtrack: Option<(NodeIndex<u32>, EdgeIndex<u32>)>,
    /// Whether reaching this node required ripping up items.
    pub ripped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MazeOutcome {
    /// Path from a start node to a destination node, as `(node, edge into it)` pairs.
    Found(Vec<(NodeIndex<u32>, Option<EdgeIndex<u32>>)>),
    Exhausted,
    Timeout,
}

pub struct MazeSearch<'a> {
    expansion: &'a ExpansionGraph,
    control: &'a AutorouteControl,
    stop: Option<&'a StopHandle>,
    elements: Vec<MazeSearchElement>,
    frontier: BinaryHeap<MinScored<(NodeIndex<u32>, Option<(NodeIndex<u32>, EdgeIndex<u32>)>)>>,
    sequence: u64,
}

impl<'a> MazeSearch<'a> {
    pub fn new(
        expansion: &'a ExpansionGraph,
        control: &'a AutorouteControl,
        stop: Option<&'a StopHandle>,
    ) -> Self {
        let mut this = Self {
            expansion,
            control,
            stop,
            elements: vec![MazeSearchElement::default(); expansion.graph.node_count()],
            frontier: BinaryHeap::new(),
            sequence: 0,
        };

        for node in expansion.graph.node_indices() {
            if expansion.graph[node].is_start {
                this.push(0.0, node, None);
            }
        }

        this
    }

    fn push(
        &mut self,
        cost: f64,
        node: NodeIndex<u32>,
        backtrack: Option<(NodeIndex<u32>, EdgeIndex<u32>)>,
    ) {
        self.frontier.push(MinScored {
            cost,
            sequence: self.sequence,
            item: (node, backtrack),
        });
        self.sequence += 1;
    }

    fn room_of(&self, edge: Option<EdgeIndex<u32>>) -> Option<RoomIndex> {
        match self.expansion.graph[edge?] {
            MazeEdge::Room { room, .. } => Some(room),
            MazeEdge::Drill { .. } => None,
        }
    }

    /// Cost of the items `room` rips up beyond those the previous room already ripped.
    fn ripup_cost(&self, room: RoomIndex, previous_room: Option<RoomIndex>) -> f64 {
        let ripup = &self.expansion.room(room).ripup;
        let previous = previous_room.map(|previous| &self.expansion.room(previous).ripup);

        ripup
            .iter()
            .filter(|item| previous.map_or(true, |previous| !previous.contains(item)))
            .map(|item| self.expansion.ripup_costs.get(item).copied().unwrap_or(1.0))
            .sum()
    }

    pub fn run(mut self) -> MazeOutcome {
        while let Some(MinScored {
            cost,
            item: (node, backtrack),
            ..
        }) = self.frontier.pop()
        {
            if self.control.is_past_deadline()
                || self.stop.map_or(false, |stop| stop.is_stop_requested())
            {
                debug!("connection search for net {} timed out", self.control.net_no);
                return MazeOutcome::Timeout;
            }

            if self.elements[node.index()].occupied {
                continue;
            }

            let expansion = self.expansion;
            let previous_room = self.room_of(backtrack.map(|(_, edge)| edge));
            let element = &mut self.elements[node.index()];

            element.occupied = true;
            element.cost = cost;
            element.backtrack = backtrack;
            element.ripped =
                previous_room.map_or(false, |room| !expansion.room(room).is_free());

            if expansion.graph[node].is_destination {
                trace!("destination reached at cost {}", cost);
                return MazeOutcome::Found(self.backtrack(node));
            }

            for edge in expansion.graph.edges(node) {
                let next = if edge.source() == node {
                    edge.target()
                } else {
                    edge.source()
                };

                if self.elements[next.index()].occupied {
                    continue;
                }

                let edge_cost = match *edge.weight() {
                    MazeEdge::Room { room, cost } => cost + self.ripup_cost(room, previous_room),
                    MazeEdge::Drill { cost } => cost,
                };

                self.push(cost + edge_cost, next, Some((node, edge.id())));
            }
        }

        MazeOutcome::Exhausted
    }

    fn backtrack(&self, last: NodeIndex<u32>) -> Vec<(NodeIndex<u32>, Option<EdgeIndex<u32>>)> {
        let mut path = vec![];
        let mut current = Some(last);

        while let Some(node) = current {
            let backtrack = self.elements[node.index()].backtrack;
            path.push((node, backtrack.map(|(_, edge)| edge)));
            current = backtrack.map(|(previous, _)| previous);
        }

        path.reverse();
        path
    }

    /// Items the path rips up.
    pub fn ripped_items(
        expansion: &ExpansionGraph,
        path: &[(NodeIndex<u32>, Option<EdgeIndex<u32>>)],
    ) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = path
            .iter()
            .filter_map(|(_, edge)| match expansion.graph[(*edge)?] {
                MazeEdge::Room { room, .. } => Some(room),
                MazeEdge::Drill { .. } => None,
            })
            .flat_map(|room| expansion.room(room).ripup.iter().copied())
            .collect();
        items.sort_unstable();
        items.dedup();
        items
    }
}
