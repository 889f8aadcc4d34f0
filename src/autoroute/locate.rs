//! Turns a path through the expansion graph into the traces and vias to insert.

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::{
    autoroute::{
        maze::MazeSearch,
        room::{ExpansionGraph, MazeEdge},
    },
    board::item::ItemId,
    geometry::IntPoint,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LocatedTrace {
    pub layer: usize,
    pub corners: Vec<IntPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedVia {
    pub center: IntPoint,
    pub first_layer: usize,
    pub last_layer: usize,
}

/// Items a found connection consists of, plus the items it requires ripping up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocatedConnection {
    pub traces: Vec<LocatedTrace>,
    pub vias: Vec<LocatedVia>,
    pub ripup: Vec<ItemId>,
}

impl LocatedConnection {
    pub fn new(
        expansion: &ExpansionGraph,
        path: &[(NodeIndex<u32>, Option<EdgeIndex<u32>>)],
    ) -> Self {
        let mut traces = vec![];
        let mut vias = vec![];
        let mut run: Option<LocatedTrace> = None;

        for (node, edge) in path.iter() {
            let weight = expansion.graph[*node];

            match edge.map(|edge| expansion.graph[edge]) {
                Some(MazeEdge::Drill { .. }) => {
                    let Some(previous) = run.take() else {
                        continue;
                    };

                    let (first_layer, last_layer) = if previous.layer < weight.layer {
                        (previous.layer, weight.layer)
                    } else {
                        (weight.layer, previous.layer)
                    };

                    vias.push(LocatedVia {
                        center: weight.point,
                        first_layer,
                        last_layer,
                    });
                    traces.push(previous);
                    run = Some(LocatedTrace {
                        layer: weight.layer,
                        corners: vec![weight.point],
                    });
                }
                Some(MazeEdge::Room { .. }) => {
                    if let Some(run) = run.as_mut() {
                        run.corners.push(weight.point);
                    }
                }
                None => {
                    run = Some(LocatedTrace {
                        layer: weight.layer,
                        corners: vec![weight.point],
                    });
                }
            }
        }

        traces.extend(run);
        traces.retain(|trace| trace.corners.len() >= 2);

        Self {
            traces,
            vias,
            ripup: MazeSearch::ripped_items(expansion, path),
        }
    }
}
