//! Routes one connection: builds the expansion rooms between a start and a destination item
//! set, searches them, and commits the path found.

use std::collections::BTreeSet;

use log::debug;
use thiserror::Error;

use crate::{
    autoroute::{
        control::AutorouteControl,
        insert::ConnectionInserter,
        locate::LocatedConnection,
        maze::{MazeOutcome, MazeSearch},
        room::{ExpansionGraph, Terminals},
        stop::StopHandle,
    },
    board::{item::ItemId, BoardError, RoutingBoard},
    geometry::IntBox,
    rules::{AccessRules, ClearanceError},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutorouteError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Clearance(#[from] ClearanceError),
    #[error("found a path for net {0} but could not insert it")]
    InsertFailed(usize),
}

impl AutorouteError {
    /// Whether the error comes from a broken invariant rather than from one connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AutorouteError::Board(BoardError::Undo(..))
                | AutorouteError::Board(BoardError::LayerOutOfRange { .. })
                | AutorouteError::Clearance(..)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutorouteResult {
    AlreadyConnected,
    Routed,
    NotFound,
}

/// Connects some item of `start` to some item of `destination`.
///
/// The search first runs in a window around both sets and falls back to the whole board.
/// Items ripped up for the new connection are added to `ripped`. On `NotFound` the board is
/// unchanged.
pub fn autoroute_connection(
    board: &mut RoutingBoard,
    control: &AutorouteControl,
    start: &BTreeSet<ItemId>,
    destination: &BTreeSet<ItemId>,
    ripped: &mut BTreeSet<ItemId>,
    stop: Option<&StopHandle>,
) -> Result<AutorouteResult, AutorouteError> {
    if start.is_empty()
        || destination.is_empty()
        || is_connected(board, control, start, destination)
    {
        return Ok(AutorouteResult::AlreadyConnected);
    }

    check_clearance_classes(board, control)?;

    let start_terminals = Terminals::of_items(board, start, control);
    let destination_terminals = Terminals::of_items(board, destination, control);

    let (Some(start_bbox), Some(destination_bbox)) = (
        start_terminals.bounding_box(),
        destination_terminals.bounding_box(),
    ) else {
        debug!("net {} has no terminal on an active layer", control.net_no);
        return Ok(AutorouteResult::NotFound);
    };

    for window in search_windows(board, control, &start_bbox.union(&destination_bbox)) {
        let expansion = ExpansionGraph::build(
            board,
            control,
            &window,
            &start_terminals,
            &destination_terminals,
        );

        match MazeSearch::new(&expansion, control, stop).run() {
            MazeOutcome::Found(path) => {
                let connection = LocatedConnection::new(&expansion, &path);
                drop(expansion);

                ConnectionInserter::new(board, control).insert(&connection, ripped)?;
                debug!(
                    "routed net {} with {} traces, {} vias, {} ripped",
                    control.net_no,
                    connection.traces.len(),
                    connection.vias.len(),
                    connection.ripup.len()
                );
                return Ok(AutorouteResult::Routed);
            }
            MazeOutcome::Timeout => return Ok(AutorouteResult::NotFound),
            MazeOutcome::Exhausted => {
                debug!("no path for net {} within {:?}", control.net_no, window)
            }
        }
    }

    Ok(AutorouteResult::NotFound)
}

fn is_connected(
    board: &RoutingBoard,
    control: &AutorouteControl,
    start: &BTreeSet<ItemId>,
    destination: &BTreeSet<ItemId>,
) -> bool {
    let Some(first) = start.iter().next() else {
        return true;
    };

    let connected = board.connected_set(*first, control.net_no);
    destination.iter().any(|id| connected.contains(id) || start.contains(id))
}

/// Net classes refer to clearance classes by index; an index outside the matrix is a
/// configuration error.
fn check_clearance_classes(
    board: &RoutingBoard,
    control: &AutorouteControl,
) -> Result<(), ClearanceError> {
    let matrix = &board.rules().clearance_matrix;

    for layer in 0..board.layer_count() {
        matrix.try_value(control.trace_clearance_class, control.trace_clearance_class, layer)?;
        matrix.try_value(control.via_clearance_class, control.via_clearance_class, layer)?;
    }

    Ok(())
}

/// A window around the connection, then the whole board.
fn search_windows(
    board: &RoutingBoard,
    control: &AutorouteControl,
    terminal_bbox: &IntBox,
) -> Vec<IntBox> {
    let board_bbox = board.bounding_box();
    let largest_clearance = (0..board.layer_count())
        .map(|layer| {
            board
                .rules()
                .largest_clearance(control.trace_clearance_class, layer)
        })
        .max()
        .unwrap_or(0);
    let margin = (terminal_bbox.width() + terminal_bbox.height()) / 4
        + 10 * (control.max_trace_half_width() + largest_clearance)
        + control.via_radius;

    match terminal_bbox.offset(margin).intersection(&board_bbox) {
        Some(local) if local != board_bbox => vec![local, board_bbox],
        _ => vec![board_bbox],
    }
}
