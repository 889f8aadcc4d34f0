use serde::{Deserialize, Serialize};

use crate::{
    board::{
        item::{GetFixedState, HasNet, Item, ItemKind},
        RoutingBoard,
    },
    settings::ScoringSettings,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    pub total: usize,
    pub traces: usize,
    pub vias: usize,
    pub fixed_vias: usize,
    pub pins: usize,
    pub conduction_areas: usize,
    pub keepouts: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceStatistics {
    pub total_length: f64,
    pub segment_count: usize,
    pub bend_count: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatistics {
    /// Connections a fully routed board has: for every net, its terminal count minus one.
    pub maximum_count: usize,
    /// Connections still missing: for every net, the number of its components holding a
    /// terminal, minus one.
    pub incomplete_count: usize,
}

/// Summary of a board used to score and compare routing results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardStatistics {
    pub items: ItemCounts,
    pub traces: TraceStatistics,
    pub connections: ConnectionStatistics,
    pub clearance_violations: usize,
}

impl BoardStatistics {
    pub fn new(board: &RoutingBoard) -> Self {
        let mut items = ItemCounts::default();
        let mut traces = TraceStatistics::default();

        for item in board.items() {
            items.total += 1;

            match item {
                Item::Trace(trace) => {
                    items.traces += 1;
                    traces.total_length += trace.length();
                    traces.segment_count += trace.polyline.segment_count();
                    traces.bend_count += trace.polyline.bend_count();
                }
                Item::Via(via) => {
                    items.vias += 1;

                    if via.fixed_state().is_fixed() {
                        items.fixed_vias += 1;
                    }
                }
                Item::Pin(..) => items.pins += 1,
                Item::ConductionArea(..) => items.conduction_areas += 1,
                Item::Keepout(..) => items.keepouts += 1,
            }
        }

        Self {
            items,
            traces,
            connections: Self::connections(board),
            clearance_violations: board.clearance_violations().len(),
        }
    }

    fn connections(board: &RoutingBoard) -> ConnectionStatistics {
        let mut statistics = ConnectionStatistics::default();

        for net in board.nets_with_items() {
            let is_terminal = |id| {
                board.item(id).map_or(false, |item| {
                    matches!(item.kind(), ItemKind::Pin | ItemKind::ConductionArea)
                        && item.contains_net(net)
                })
            };

            let terminal_count = board.net_items(net).filter(|id| is_terminal(*id)).count();
            let terminal_components = board
                .net_components(net)
                .iter()
                .filter(|component| component.iter().any(|id| is_terminal(*id)))
                .count();

            statistics.maximum_count += terminal_count.saturating_sub(1);
            statistics.incomplete_count += terminal_components.saturating_sub(1);
        }

        statistics
    }

    /// Higher is better. Unrouted connections weigh most, then clearance violations, then
    /// bends; trace length and vias cost a little.
    pub fn score(&self, scoring: &ScoringSettings) -> f64 {
        let max = self.connections.maximum_count as f64 * scoring.unrouted_net_penalty;

        max - (self.connections.incomplete_count as f64 * scoring.unrouted_net_penalty
            + self.clearance_violations as f64 * scoring.clearance_violation_penalty
            + self.traces.bend_count as f64 * scoring.bend_penalty)
            - (self.traces.total_length * scoring.trace_length_cost
                + self.items.vias as f64 * scoring.via_cost)
    }

    /// Score scaled to `0..=1000`.
    pub fn normalized_score(&self, scoring: &ScoringSettings) -> f64 {
        let max = self.connections.maximum_count as f64 * scoring.unrouted_net_penalty;

        if max <= 0.0 {
            return 0.0;
        }

        (self.score(scoring) / max).max(0.0) * 1000.0
    }

    pub fn is_fully_routed(&self) -> bool {
        self.connections.incomplete_count == 0
    }
}
