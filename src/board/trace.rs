//! Trace maintenance on a routing board: combining traces that meet end to end, splitting
//! traces where other items attach, and removing dangling tails.

use std::collections::{BTreeSet, VecDeque};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    board::{
        item::{GetId, HasNet, Item, ItemId, ItemKind, Routable, Trace},
        RoutingBoard,
    },
    geometry::{distance::segment_crossing, IntPoint, ItemShape, Polyline},
};

/// Which dangling items tail removal keeps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopConnectionOption {
    /// Remove every via with fewer than two contacts.
    #[default]
    None,
    /// Keep vias with exactly one contact, e.g. fanout vias next to a pin.
    FanoutVia,
}

impl RoutingBoard {
    /// Items of the trace's nets touching its end at `point`, the trace itself excluded.
    pub fn end_contacts(&self, trace: &Trace, point: IntPoint) -> BTreeSet<ItemId> {
        let end = ItemShape::point(point, trace.half_width);

        self.search_tree()
            .overlapping_entries(&end, trace.layer)
            .filter(|entry| entry.item != trace.id)
            .filter(|entry| entry.is_connectable() && trace.shares_net(&entry.nets))
            .map(|entry| entry.item)
            .collect()
    }

    fn contacts(&self, item: &Item) -> BTreeSet<ItemId> {
        item.nets()
            .iter()
            .flat_map(|net| self.net_neighbours(item.id(), *net))
            .collect()
    }

    /// The routable traces and vias on the connection through `id`. The walk stops before
    /// fixed items and before branch points where more than two items meet.
    pub fn connection_items(&self, id: ItemId) -> BTreeSet<ItemId> {
        let mut items = BTreeSet::from([id]);
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            let Some(current_item) = self.item(current) else {
                continue;
            };

            for contact in self.contacts(current_item) {
                if items.contains(&contact) {
                    continue;
                }

                let Some(contact_item) = self.item(contact) else {
                    continue;
                };

                if !contact_item.is_routable()
                    || !matches!(contact_item.kind(), ItemKind::Trace | ItemKind::Via)
                    || self.contacts(contact_item).len() > 2
                {
                    continue;
                }

                items.insert(contact);
                queue.push_back(contact);
            }
        }

        items
    }

    fn is_tail(&self, item: &Item, option: StopConnectionOption) -> bool {
        match item {
            Item::Trace(trace) => {
                self.end_contacts(trace, trace.first_corner()).is_empty()
                    || self.end_contacts(trace, trace.last_corner()).is_empty()
            }
            Item::Via(..) => {
                let contact_count = self.contacts(item).len();

                match option {
                    StopConnectionOption::None => contact_count < 2,
                    StopConnectionOption::FanoutVia => contact_count < 1,
                }
            }
            _ => false,
        }
    }

    /// Repeatedly removes routable traces with a dangling end and routable vias without
    /// enough contacts, restricted to `net` if given. Returns whether anything was removed.
    pub fn remove_trace_tails(&mut self, net: Option<usize>, option: StopConnectionOption) -> bool {
        let mut removed_any = false;

        loop {
            let tails: Vec<ItemId> = self
                .items()
                .filter(|item| matches!(item.kind(), ItemKind::Trace | ItemKind::Via))
                .filter(|item| item.is_routable())
                .filter(|item| net.map_or(true, |net| item.contains_net(net)))
                .filter(|item| self.is_tail(item, option))
                .map(|item| item.id())
                .collect();

            if tails.is_empty() {
                break;
            }

            trace!("removing {} tail items", tails.len());

            for tail in tails {
                self.remove(tail);
            }

            removed_any = true;
        }

        removed_any
    }

    /// The single trace `trace` can be joined with at `point`, if no other item touches
    /// the joint.
    fn combinable_partner(&self, trace: &Trace, point: IntPoint) -> Option<Trace> {
        let contacts = self.end_contacts(trace, point);

        if contacts.len() != 1 {
            return None;
        }

        let other = self.item(*contacts.iter().next()?)?.as_trace()?;

        if !trace.is_combinable_with(other)
            || (other.first_corner() != point && other.last_corner() != point)
            || self.end_contacts(other, point).len() != 1
        {
            return None;
        }

        Some(other.clone())
    }

    /// Joins the trace `id` with the traces continuing it end to end, as long as no third
    /// item touches a joint. Returns the id of the combined trace, or `None` if nothing was
    /// combined.
    pub fn combine_trace(&mut self, id: ItemId) -> Option<ItemId> {
        let mut current = self.item(id)?.as_trace()?.clone();
        let mut combined = None;

        loop {
            let partner = self
                .combinable_partner(&current, current.first_corner())
                .or_else(|| self.combinable_partner(&current, current.last_corner()));

            let Some(partner) = partner else {
                break;
            };

            let Some(polyline) = current.polyline.combine(&partner.polyline) else {
                break;
            };

            let mut joined = current.clone();
            joined.polyline = polyline;

            self.remove(current.id);
            self.remove(partner.id);

            let Ok(joined_id) = self.insert(Item::Trace(joined)) else {
                break;
            };

            trace!("combined {} and {} into {}", current.id, partner.id, joined_id);
            current = self.item(joined_id)?.as_trace()?.clone();
            combined = Some(joined_id);
        }

        combined
    }

    /// Interior points of `trace` where another item of its net attaches: ends of other
    /// traces, via and pin centers, and integral crossings with other traces.
    fn split_points(&self, trace: &Trace) -> BTreeSet<IntPoint> {
        let bbox = trace.polyline.bounding_box().offset(trace.half_width);
        let mut points = BTreeSet::new();

        for entry in self.search_tree().entries_in_box(&bbox, trace.layer) {
            if entry.item == trace.id || !trace.shares_net(&entry.nets) {
                continue;
            }

            let Some(item) = self.item(entry.item) else {
                continue;
            };

            match item {
                Item::Trace(other) => {
                    points.insert(other.first_corner());
                    points.insert(other.last_corner());

                    for (from, to) in trace.polyline.segments() {
                        for (other_from, other_to) in other.polyline.segments() {
                            if let Some(crossing) = segment_crossing(from, to, other_from, other_to)
                            {
                                points.insert(crossing);
                            }
                        }
                    }
                }
                Item::Via(..) | Item::Pin(..) => {
                    points.extend(item.drill_center());
                }
                _ => (),
            }
        }

        points.retain(|point| {
            *point != trace.first_corner()
                && *point != trace.last_corner()
                && trace.polyline.contains_point(*point)
        });
        points
    }

    /// Splits the trace `id` at every interior point where another item of its net attaches,
    /// then drops pieces that another trace of the net already covers. Returns the ids of
    /// the remaining pieces; the trace itself if it was not split.
    pub fn split_trace(&mut self, id: ItemId) -> Vec<ItemId> {
        let Some(trace) = self.item(id).and_then(|item| item.as_trace()).cloned() else {
            return vec![];
        };

        let split_points = self.split_points(&trace);

        if split_points.is_empty() {
            return vec![id];
        }

        let mut pieces = vec![trace.polyline.clone()];

        for point in split_points {
            pieces = pieces
                .into_iter()
                .flat_map(|piece| match piece.split_at(point) {
                    Some((first, second)) => vec![first, second],
                    None => vec![piece],
                })
                .collect();
        }

        self.remove(id);

        let mut piece_ids = vec![];

        for polyline in pieces {
            let mut piece = trace.clone();
            piece.polyline = polyline;

            if let Ok(piece_id) = self.insert(Item::Trace(piece)) {
                piece_ids.push(piece_id);
            }
        }

        piece_ids.retain(|piece_id| {
            if self.is_covered_trace(*piece_id) {
                self.remove(*piece_id);
                false
            } else {
                true
            }
        });

        trace!("split {} into {:?}", id, piece_ids);
        piece_ids
    }

    /// Whether another trace of the same net and layer lies over all of trace `id`.
    fn is_covered_trace(&self, id: ItemId) -> bool {
        let Some(trace) = self.item(id).and_then(|item| item.as_trace()) else {
            return false;
        };

        self.search_tree()
            .entries_in_box(&trace.polyline.bounding_box(), trace.layer)
            .filter(|entry| entry.item != id && entry.kind == ItemKind::Trace)
            .filter_map(|entry| self.item(entry.item).and_then(|item| item.as_trace()))
            .any(|other| {
                trace.is_combinable_with(other) && trace.polyline.is_covered_by(&other.polyline)
            })
    }

    /// Whether the two ends of trace `id` are already connected to each other without it.
    pub fn is_cycle(&self, id: ItemId) -> bool {
        let Some(trace) = self.item(id).and_then(|item| item.as_trace()) else {
            return false;
        };

        let start_contacts = self.end_contacts(trace, trace.first_corner());
        let end_contacts = self.end_contacts(trace, trace.last_corner());

        if start_contacts.is_empty() || end_contacts.is_empty() {
            return false;
        }

        let mut visited: BTreeSet<ItemId> = start_contacts.clone();
        let mut queue: VecDeque<ItemId> = start_contacts.into_iter().collect();

        while let Some(current) = queue.pop_front() {
            if end_contacts.contains(&current) {
                return true;
            }

            for net in trace.nets.iter() {
                for neighbour in self.net_neighbours(current, *net) {
                    if neighbour != id && visited.insert(neighbour) {
                        queue.push_back(neighbour);
                    }
                }
            }
        }

        false
    }

    /// Normalizes the traces of `net` after routing: combines traces that meet end to end,
    /// then splits them where other items attach. Returns the surviving trace ids.
    pub fn normalize_traces(&mut self, net: usize) -> BTreeSet<ItemId> {
        let traces: Vec<ItemId> = self
            .net_items(net)
            .filter(|id| {
                self.item(*id)
                    .map_or(false, |item| item.kind() == ItemKind::Trace && item.is_routable())
            })
            .collect();

        for id in traces {
            if self.contains(id) {
                self.combine_trace(id);
            }
        }

        let traces: Vec<ItemId> = self
            .net_items(net)
            .filter(|id| self.item(*id).map_or(false, |item| item.kind() == ItemKind::Trace))
            .collect();

        for id in traces {
            if self.contains(id) && self.item(id).map_or(false, |item| item.is_routable()) {
                self.split_trace(id);
            }
        }

        self.net_items(net)
            .filter(|id| self.item(*id).map_or(false, |item| item.kind() == ItemKind::Trace))
            .collect()
    }
}

/// Number of traces added or removed since `before` was taken with
/// [`RoutingBoard::trace_ids`].
pub fn diff_traces(before: &BTreeSet<ItemId>, board: &RoutingBoard) -> usize {
    board.trace_ids().symmetric_difference(before).count()
}

/// A trace polyline through `corners`; `None` if fewer than two distinct corners remain.
pub fn trace_polyline(corners: impl IntoIterator<Item = IntPoint>) -> Option<Polyline> {
    let polyline = Polyline::new(corners);
    (!polyline.is_degenerate()).then_some(polyline)
}
