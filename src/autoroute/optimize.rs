//! Route optimization on a routed board. Every pass sweeps the routable items by position,
//! rips up the connections through each one and reroutes them on a copy of the board. The
//! copy replaces the board only if it scores better.

use std::{collections::BTreeSet, ops::ControlFlow};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    autoroute::{
        batch::BatchAutorouter, engine::AutorouteError, observer::AutorouterObserverTrait,
        stop::StopHandle,
    },
    board::{
        item::{GetId, HasNet, Item, ItemId, ItemKind, Routable},
        statistics::BoardStatistics,
        RoutingBoard,
    },
    geometry::IntPoint,
    settings::RouterSettings,
    stepper::{Abort, Step},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizeTermination {
    /// A pass raised the score by less than the improvement threshold.
    Converged,
    PassLimit,
    Cancelled,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizeCounters {
    pub pass_no: usize,
    pub tried: usize,
    pub improved: usize,
    pub score_before: f64,
    pub score_after: f64,
}

/// Sweep position of an item: its corner or center, then its layer.
type SweepKey = (IntPoint, usize);

pub struct RouteOptimizer {
    board: RoutingBoard,
    settings: RouterSettings,
    stop: StopHandle,
    pass_no: usize,
    increased_ripup: bool,
    score: f64,
    termination: Option<OptimizeTermination>,
}

impl RouteOptimizer {
    pub fn new(board: RoutingBoard, settings: RouterSettings) -> Self {
        Self::new_with_stop(board, settings, StopHandle::new())
    }

    pub fn new_with_stop(board: RoutingBoard, settings: RouterSettings, stop: StopHandle) -> Self {
        let score = BoardStatistics::new(&board).normalized_score(&settings.scoring);

        Self {
            board,
            settings,
            stop,
            pass_no: 1,
            increased_ripup: true,
            score,
            termination: None,
        }
    }

    pub fn board(&self) -> &RoutingBoard {
        &self.board
    }

    pub fn into_board(self) -> RoutingBoard {
        self.board
    }

    /// Normalized score of the current board.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn pass_no(&self) -> usize {
        self.pass_no
    }

    pub fn termination(&self) -> Option<OptimizeTermination> {
        self.termination
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs passes until the score stops improving, the pass limit is hit or a stop is
    /// requested.
    pub fn optimize(
        &mut self,
        observer: &mut impl AutorouterObserverTrait,
    ) -> Result<OptimizeTermination, AutorouteError> {
        <Self as Step<_, OptimizeTermination, OptimizeCounters>>::finish(self, observer)
    }

    fn optimize_pass(&mut self) -> Result<OptimizeCounters, AutorouteError> {
        let with_preferred_directions = self.pass_no % 2 == 1;
        let mut counters = OptimizeCounters {
            pass_no: self.pass_no,
            score_before: self.score,
            ..Default::default()
        };
        let mut position = None;

        while let Some((item, key)) = self.next_item(position) {
            if self.stop.is_stop_requested() {
                break;
            }

            position = Some(key);
            counters.tried += 1;

            if self.optimize_item(item, with_preferred_directions)? {
                counters.improved += 1;
            }
        }

        self.board.compact();
        counters.score_after = self.score;
        Ok(counters)
    }

    /// The routable item following `after` in sweep order. At equal positions vias come
    /// first. Traces touching a routable via are skipped: ripping the via takes them along.
    fn next_item(&self, after: Option<SweepKey>) -> Option<(ItemId, SweepKey)> {
        let is_after = |key: &SweepKey| after.map_or(true, |after| *key > after);
        let mut next: Option<(ItemId, SweepKey)> = None;

        for item in self.board.items().filter(|item| item.is_routable()) {
            let Item::Via(via) = item else {
                continue;
            };
            let key = (via.center, via.first_layer);

            if is_after(&key) && next.map_or(true, |(_, next_key)| key < next_key) {
                next = Some((via.id, key));
            }
        }

        for item in self.board.items().filter(|item| item.is_routable()) {
            let Item::Trace(trace) = item else {
                continue;
            };
            let key = (trace.first_corner().max(trace.last_corner()), trace.layer);

            if !is_after(&key) || next.map_or(false, |(_, next_key)| key >= next_key) {
                continue;
            }

            if !self.touches_routable_via(item) {
                next = Some((trace.id, key));
            }
        }

        next
    }

    fn touches_routable_via(&self, item: &Item) -> bool {
        item.nets().iter().any(|net| {
            self.board
                .net_neighbours(item.id(), *net)
                .into_iter()
                .filter_map(|id| self.board.item(id))
                .any(|neighbour| neighbour.kind() == ItemKind::Via && neighbour.is_routable())
        })
    }

    /// `id`, the unfixed traces continuing it at either end, and every item on their
    /// connections.
    fn ripped_items(&self, id: ItemId) -> BTreeSet<ItemId> {
        let mut seeds = BTreeSet::from([id]);

        if let Some(Item::Trace(trace)) = self.board.item(id) {
            for end in [trace.first_corner(), trace.last_corner()] {
                let contacts = self.board.end_contacts(trace, end);

                if contacts.iter().all(|contact| {
                    self.board.item(*contact).map_or(false, |item| {
                        item.kind() == ItemKind::Trace && item.is_routable()
                    })
                }) {
                    seeds.extend(contacts);
                }
            }
        }

        seeds
            .into_iter()
            .flat_map(|seed| self.board.connection_items(seed))
            .collect()
    }

    fn ripup_costs(&self, is_trace: bool) -> u32 {
        let mut costs = self.settings.start_ripup_costs as f64;

        if self.increased_ripup {
            costs *= self.settings.optimizer.start_ripup_factor as f64;
        }

        if is_trace {
            costs *= 0.6;
        }

        costs.round() as u32
    }

    /// Rips up the connections through `id` on a copy of the board and reroutes them. The
    /// copy is kept if no connection got lost and the score went up. Returns whether it was.
    fn optimize_item(
        &mut self,
        id: ItemId,
        with_preferred_directions: bool,
    ) -> Result<bool, AutorouteError> {
        let Some(item) = self.board.item(id) else {
            return Ok(false);
        };
        let is_trace = item.kind() == ItemKind::Trace;
        let nets: Vec<usize> = item.nets().to_vec();
        let ripped = self.ripped_items(id);

        let mut candidate = self.board.clone();

        for ripped_id in ripped.iter() {
            candidate.remove(*ripped_id);
        }

        for net in nets {
            candidate.normalize_traces(net);
        }

        let (candidate, passes) = BatchAutorouter::autoroute_passes_for_optimizing_item(
            candidate,
            &self.settings,
            self.settings.optimizer.max_item_passes,
            self.ripup_costs(is_trace),
            with_preferred_directions,
            self.stop.clone(),
        )?;

        if self.stop.is_stop_requested() {
            return Ok(false);
        }

        let before = BoardStatistics::new(&self.board);
        let after = BoardStatistics::new(&candidate);
        let score = after.normalized_score(&self.settings.scoring);

        if after.connections.incomplete_count > before.connections.incomplete_count
            || score <= self.score
        {
            debug!(
                "rerouting {} items around {} in {} passes scored {:.3}, keeping {:.3}",
                ripped.len(),
                id,
                passes,
                score,
                self.score
            );
            return Ok(false);
        }

        debug!(
            "rerouting {} items around {} raised the score from {:.3} to {:.3}",
            ripped.len(),
            id,
            self.score,
            score
        );
        self.board = candidate;
        self.score = score;
        Ok(true)
    }

    fn terminate(&mut self, termination: OptimizeTermination) -> OptimizeTermination {
        self.board.compact();
        info!(
            "optimizer finished after pass {}: {:?}, score {:.3}",
            self.pass_no - 1,
            termination,
            self.score
        );
        self.termination = Some(termination);
        termination
    }
}

impl<O: AutorouterObserverTrait> Step<O, OptimizeTermination, OptimizeCounters>
    for RouteOptimizer
{
    type Error = AutorouteError;

    fn step(
        &mut self,
        observer: &mut O,
    ) -> Result<ControlFlow<OptimizeTermination, OptimizeCounters>, AutorouteError> {
        if let Some(termination) = self.termination {
            return Ok(ControlFlow::Break(termination));
        }

        if self.stop.is_stop_requested() {
            return Ok(ControlFlow::Break(self.terminate(OptimizeTermination::Cancelled)));
        }

        if self.pass_no > self.settings.optimizer.max_passes {
            return Ok(ControlFlow::Break(self.terminate(OptimizeTermination::PassLimit)));
        }

        observer.on_pass_start(self.pass_no, &self.board);
        let counters = self.optimize_pass()?;
        self.pass_no += 1;

        info!(
            "optimizer pass {}: {} of {} items improved, score {:.3} -> {:.3}",
            counters.pass_no,
            counters.improved,
            counters.tried,
            counters.score_before,
            counters.score_after
        );

        if self.stop.is_stop_requested() {
            return Ok(ControlFlow::Break(self.terminate(OptimizeTermination::Cancelled)));
        }

        let improvement = counters.score_after - counters.score_before;

        if improvement <= 0.0 && self.increased_ripup {
            // Retry with plain ripup costs before giving up.
            self.increased_ripup = false;
            return Ok(ControlFlow::Continue(counters));
        }

        if improvement <= 0.0 || improvement < self.settings.optimizer.improvement_threshold {
            return Ok(ControlFlow::Break(self.terminate(OptimizeTermination::Converged)));
        }

        Ok(ControlFlow::Continue(counters))
    }
}

impl<O> Abort<O> for RouteOptimizer {
    fn abort(&mut self, _observer: &mut O) {
        self.stop.request_stop();
    }
}
