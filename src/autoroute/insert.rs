//! Commits a located connection to the board.

use std::collections::BTreeSet;

use log::{debug, trace};

use crate::{
    autoroute::{
        control::AutorouteControl,
        engine::AutorouteError,
        locate::{LocatedConnection, LocatedTrace},
    },
    board::{
        item::{FixedState, HasNet, ItemId},
        trace::{trace_polyline, StopConnectionOption},
        RoutingBoard,
    },
    geometry::{IntPoint, ItemShape},
};

pub struct ConnectionInserter<'a> {
    board: &'a mut RoutingBoard,
    control: &'a AutorouteControl,
}

impl<'a> ConnectionInserter<'a> {
    pub fn new(board: &'a mut RoutingBoard, control: &'a AutorouteControl) -> Self {
        Self { board, control }
    }

    /// Rips up the items the connection requires, then inserts its vias and traces. Either
    /// the whole connection is committed or the board is left as it was.
    ///
    /// Ripped items are added to `ripped`.
    pub fn insert(
        mut self,
        connection: &LocatedConnection,
        ripped: &mut BTreeSet<ItemId>,
    ) -> Result<Vec<ItemId>, AutorouteError> {
        let generation = self.board.snapshot();
        let mut ripped_here = vec![];

        let result = self.insert_in_snapshot(connection, &mut ripped_here);
        let restored = match &result {
            Ok(..) => Ok(()),
            Err(err) => {
                debug!("inserting connection of net {} failed: {}", self.control.net_no, err);
                self.board.restore(generation)
            }
        };

        self.board.release(generation);
        restored?;

        if result.is_ok() {
            ripped.extend(ripped_here);
        }

        result
    }

    fn insert_in_snapshot(
        &mut self,
        connection: &LocatedConnection,
        ripped: &mut Vec<ItemId>,
    ) -> Result<Vec<ItemId>, AutorouteError> {
        let mut changed_nets: BTreeSet<usize> = BTreeSet::new();

        for id in connection.ripup.iter() {
            let Some(item) = self.board.item(*id) else {
                continue;
            };

            changed_nets.extend(item.nets().iter().copied());

            if self.board.remove(*id) {
                ripped.push(*id);
            }
        }

        let mut inserted = vec![];
        let net = self.control.net_no;

        for via in connection.vias.iter() {
            inserted.push(self.board.insert_via(
                via.center,
                via.first_layer,
                via.last_layer,
                net,
                FixedState::NotFixed,
            )?);
        }

        for located in connection.traces.iter() {
            let corners = self.pull_tight(located);
            let Some(polyline) = trace_polyline(corners) else {
                continue;
            };

            inserted.push(self.board.insert_trace(
                polyline,
                located.layer,
                self.control.trace_half_width[located.layer],
                net,
                FixedState::NotFixed,
            )?);
        }

        if inserted.is_empty() {
            return Err(AutorouteError::InsertFailed(net));
        }

        self.board.normalize_traces(net);

        let option = if self.control.remove_unconnected_vias {
            StopConnectionOption::None
        } else {
            StopConnectionOption::FanoutVia
        };

        for changed_net in changed_nets.into_iter().filter(|changed| *changed != net) {
            self.board.remove_trace_tails(Some(changed_net), option);
        }

        trace!("inserted {} items for net {}", inserted.len(), net);
        Ok(inserted)
    }

    /// Drops every corner whose neighbours can be joined by a clearance-clean straight
    /// segment.
    fn pull_tight(&self, located: &LocatedTrace) -> Vec<IntPoint> {
        let mut corners: Vec<IntPoint> = vec![];
        let mut corners_iter = located.corners.iter().copied().peekable();

        while let Some(corner) = corners_iter.next() {
            if corners.last() == Some(&corner) {
                continue;
            }

            let (Some(&previous), Some(&next)) = (corners.last(), corners_iter.peek()) else {
                corners.push(corner);
                continue;
            };

            if !self.is_segment_clear(previous, next, located.layer) {
                corners.push(corner);
            }
        }

        corners
    }

    fn is_segment_clear(&self, from: IntPoint, to: IntPoint, layer: usize) -> bool {
        let shape = ItemShape::Segment {
            from,
            to,
            half_width: self.control.trace_half_width[layer],
        };

        self.board
            .overlapping_with_clearance(
                &shape,
                layer,
                &[self.control.net_no],
                self.control.trace_clearance_class,
            )
            .is_empty()
    }
}
