//! Ripup-and-reroute passes over the whole board.

use std::{
    collections::{BTreeSet, HashSet},
    ops::ControlFlow,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    autoroute::{
        control::AutorouteControl,
        engine::{autoroute_connection, AutorouteError, AutorouteResult},
        history::BoardHistory,
        observer::{AutorouterObserverTrait, EmptyAutorouterObserver, RouterCounters},
        plateau::PlateauDetector,
        stop::StopHandle,
    },
    board::{
        item::{Connectable, GetId, HasNet, ItemId, ItemKind, Routable},
        statistics::BoardStatistics,
        trace::{diff_traces, StopConnectionOption},
        RoutingBoard,
    },
    debug::DebugControl,
    geometry::IntPoint,
    settings::{RouterSettings, TestLevel},
    stepper::{Abort, Step},
};

/// Why a batch run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchTermination {
    /// A pass found nothing left to route.
    Done,
    /// The last allowed pass ran.
    PassLimit,
    /// Passes stopped making a difference.
    PlateauStop,
    /// The board returned to a state it had after an earlier pass.
    CycleDetected,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingStatus {
    FullyRouted,
    PartiallyRouted,
    Cancelled,
}

/// Straight line between the closest points of the connection being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirLine {
    pub from: IntPoint,
    pub to: IntPoint,
}

/// Drives ripup-and-reroute passes over a board until it is routed, routing stops paying
/// off, or a stop is requested.
///
/// Every step runs one pass. The board is owned by the autorouter for the duration of the
/// run; take it back with [`into_board`](Self::into_board).
pub struct BatchAutorouter {
    board: RoutingBoard,
    settings: RouterSettings,
    stop: StopHandle,
    debug: Arc<DebugControl>,
    history: BoardHistory,
    plateau: PlateauDetector,
    seen_states: HashSet<u128>,
    pass_no: usize,
    interrupted: bool,
    termination: Option<BatchTermination>,
    air_line: Option<AirLine>,
    save_intermediate: bool,
}

impl BatchAutorouter {
    pub fn new(board: RoutingBoard, settings: RouterSettings) -> Self {
        Self::new_with_stop(board, settings, StopHandle::new())
    }

    pub fn new_with_stop(board: RoutingBoard, settings: RouterSettings, stop: StopHandle) -> Self {
        let debug = Arc::new(DebugControl::new(settings.debug.clone()));
        Self::new_with_controls(board, settings, stop, debug)
    }

    pub fn new_with_controls(
        board: RoutingBoard,
        settings: RouterSettings,
        stop: StopHandle,
        debug: Arc<DebugControl>,
    ) -> Self {
        Self {
            history: BoardHistory::new(settings.scoring.clone(), settings.history_capacity),
            plateau: PlateauDetector::new(settings.plateau.clone()),
            pass_no: settings.start_pass_no.max(1),
            board,
            settings,
            stop,
            debug,
            seen_states: HashSet::new(),
            interrupted: false,
            termination: None,
            air_line: None,
            save_intermediate: false,
        }
    }

    pub fn board(&self) -> &RoutingBoard {
        &self.board
    }

    pub fn into_board(self) -> RoutingBoard {
        self.board
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn history(&self) -> &BoardHistory {
        &self.history
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn debug_control(&self) -> Arc<DebugControl> {
        self.debug.clone()
    }

    /// Number of the pass the next step runs.
    pub fn pass_no(&self) -> usize {
        self.pass_no
    }

    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_stop_requested()
    }

    /// Whether the run was cut short, by a stop request or by plateau detection.
    pub fn is_stop_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn termination(&self) -> Option<BatchTermination> {
        self.termination
    }

    pub fn status(&self) -> Option<RoutingStatus> {
        let termination = self.termination?;

        Some(if termination == BatchTermination::Cancelled {
            RoutingStatus::Cancelled
        } else if BoardStatistics::new(&self.board).is_fully_routed() {
            RoutingStatus::FullyRouted
        } else {
            RoutingStatus::PartiallyRouted
        })
    }

    /// Air line of the connection currently being routed.
    pub fn get_air_line(&self) -> Option<AirLine> {
        self.air_line
    }

    /// Runs passes until the run terminates. Returns `true` unless the run was cut short by
    /// a stop request or by plateau detection.
    pub fn autoroute_passes(
        &mut self,
        save_intermediate: bool,
        observer: &mut impl AutorouterObserverTrait,
    ) -> Result<bool, AutorouteError> {
        self.save_intermediate = save_intermediate;
        <Self as Step<_, BatchTermination, RouterCounters>>::finish(self, observer)?;
        Ok(!self.interrupted)
    }

    /// Reroutes `board` for an optimizer that has just ripped up an item: up to `max_passes`
    /// passes with the given ripup costs, removing unconnected vias. Returns the board and the
    /// number of passes it took to complete it, or `max_passes + 1` if it is still
    /// incomplete.
    pub fn autoroute_passes_for_optimizing_item(
        board: RoutingBoard,
        settings: &RouterSettings,
        max_passes: usize,
        ripup_costs: u32,
        with_preferred_directions: bool,
        stop: StopHandle,
    ) -> Result<(RoutingBoard, usize), AutorouteError> {
        let settings = RouterSettings {
            start_ripup_costs: ripup_costs,
            with_preferred_directions,
            remove_unconnected_vias: true,
            ..settings.clone()
        };
        let mut autorouter = Self::new_with_stop(board, settings, stop);
        let mut observer = EmptyAutorouterObserver;

        let mut still_unrouted = true;
        let mut pass_no = 1;

        while still_unrouted && !autorouter.interrupted && pass_no <= max_passes {
            if autorouter.stop.is_stop_requested() {
                autorouter.interrupted = true;
            }

            still_unrouted = autorouter.autoroute_pass(pass_no, &mut observer)?.is_some();
            pass_no += 1;
        }

        if !still_unrouted {
            pass_no -= 1;
        }

        Ok((autorouter.board, pass_no))
    }

    /// Items to route: one connectable, non-routable item of every component of every
    /// net that is not fully connected, in store order.
    fn autoroute_items(&self) -> Vec<(ItemId, usize)> {
        let mut items = vec![];
        let mut handled: BTreeSet<ItemId> = BTreeSet::new();
        let mut cursor = self.board.start_read();

        while let Some(item) = self.board.read_next(&mut cursor) {
            if !item.is_connectable() || item.is_routable() || handled.contains(&item.id()) {
                continue;
            }

            for net in item.nets().iter().copied() {
                let connected = self.board.connected_set(item.id(), net);

                for connected_id in connected.iter() {
                    if self
                        .board
                        .item(*connected_id)
                        .map_or(false, |connected_item| connected_item.nets().len() <= 1)
                    {
                        handled.insert(*connected_id);
                    }
                }

                if connected.len() < self.board.connectable_item_count(net) {
                    items.push((item.id(), net));
                }
            }
        }

        items
    }

    /// Runs one pass over every unrouted item. Returns `None` if nothing was left to route.
    fn autoroute_pass(
        &mut self,
        pass_no: usize,
        observer: &mut impl AutorouterObserverTrait,
    ) -> Result<Option<RouterCounters>, AutorouteError> {
        let items = self.autoroute_items();

        if items.is_empty() {
            self.air_line = None;
            return Ok(None);
        }

        let mut counters = RouterCounters {
            pass_no,
            queued: items.len(),
            ..Default::default()
        };

        for (item, net) in items {
            if self.stop.is_stop_requested() {
                break;
            }

            if !self.board.contains(item) {
                counters.skipped += 1;
                continue;
            }

            let net_name = self
                .board
                .rules()
                .nets
                .net_name(net)
                .unwrap_or_default()
                .to_string();
            self.debug.check(net, &net_name);

            let mut ripped = BTreeSet::new();

            match self.autoroute_item(item, net, pass_no, &mut ripped) {
                Ok(AutorouteResult::Routed) => counters.routed += 1,
                Ok(AutorouteResult::AlreadyConnected) => counters.already_connected += 1,
                Ok(AutorouteResult::NotFound) => counters.not_found += 1,
                Err(err) if err.is_fatal() => {
                    self.air_line = None;
                    return Err(err);
                }
                Err(err) => {
                    warn!("routing {} of net {} failed: {}", item, net, err);
                    counters.not_found += 1;
                }
            }

            counters.ripped += ripped.len();
            observer.on_connection(&counters, net);
        }

        if self.settings.debug.test_level < TestLevel::AllDebugging {
            let option = if self.settings.remove_unconnected_vias {
                StopConnectionOption::None
            } else {
                StopConnectionOption::FanoutVia
            };

            self.board.remove_trace_tails(None, option);
        }

        // No reader or snapshot is open between items.
        self.board.compact();
        self.air_line = None;
        Ok(Some(counters))
    }

    /// Connects `item` to the rest of its net `net`.
    ///
    /// A net with a plane is routed from the item's component to the rest; it is done once
    /// that component holds a conduction area. Other nets are routed from the rest of the
    /// net towards the item's component.
    fn autoroute_item(
        &mut self,
        item: ItemId,
        net: usize,
        pass_no: usize,
        ripped: &mut BTreeSet<ItemId>,
    ) -> Result<AutorouteResult, AutorouteError> {
        let contains_plane = self.board.rules().nets.contains_plane(net);
        let unconnected = self.board.unconnected_set(item, net);

        if unconnected.is_empty() {
            return Ok(AutorouteResult::AlreadyConnected);
        }

        let connected = self.board.connected_set(item, net);

        let (start, destination) = if contains_plane {
            if connected.iter().any(|id| {
                self.board
                    .item(*id)
                    .map_or(false, |connected_item| {
                        connected_item.kind() == ItemKind::ConductionArea
                    })
            }) {
                return Ok(AutorouteResult::AlreadyConnected);
            }

            (connected, unconnected)
        } else {
            (unconnected, connected)
        };

        self.air_line = self.calc_air_line(&start, &destination);

        let deadline = Instant::now()
            + Duration::from_millis(self.settings.connection_time_limit_ms(pass_no));
        let control = AutorouteControl::new(&self.board, net, &self.settings)
            .with_ripup(self.settings.start_ripup_costs as f64 * pass_no as f64)
            .with_deadline(deadline);

        let result = autoroute_connection(
            &mut self.board,
            &control,
            &start,
            &destination,
            ripped,
            Some(&self.stop),
        )?;

        debug!("pass {}: {} of net {}: {:?}", pass_no, item, net, result);
        Ok(result)
    }

    /// Closest pair of pin or via centers between `from` and `to`.
    fn calc_air_line(&self, from: &BTreeSet<ItemId>, to: &BTreeSet<ItemId>) -> Option<AirLine> {
        let centers = |items: &BTreeSet<ItemId>| -> Vec<IntPoint> {
            items
                .iter()
                .filter_map(|id| self.board.item(*id))
                .filter_map(|item| item.drill_center())
                .collect()
        };

        let to_centers = centers(to);

        centers(from)
            .into_iter()
            .flat_map(|from| to_centers.iter().map(move |to| (from, *to)))
            .min_by(|(from, to), (other_from, other_to)| {
                from.distance(to).total_cmp(&other_from.distance(other_to))
            })
            .map(|(from, to)| AirLine { from, to })
    }

    /// Feeds the pass's trace difference to plateau detection. Returns whether the run
    /// should stop.
    fn record_trace_difference(&mut self, pass_no: usize, difference: usize) -> bool {
        if self.plateau.record(pass_no, difference) {
            self.interrupted = true;
        }

        self.interrupted
    }

    /// Remembers the board's state. Returns whether it was already seen after an earlier
    /// pass.
    fn record_state(&mut self) -> bool {
        !self.seen_states.insert(self.board.state_digest())
    }

    fn terminate(&mut self, termination: BatchTermination) -> BatchTermination {
        if termination == BatchTermination::Cancelled {
            self.interrupted = true;
        }

        if termination != BatchTermination::Done {
            self.restore_best_board();
        }

        if !self.interrupted
            && !self.settings.remove_unconnected_vias
            && BoardStatistics::new(&self.board).is_fully_routed()
        {
            self.board.remove_trace_tails(None, StopConnectionOption::None);
        }

        self.board.compact();

        match termination {
            BatchTermination::Done | BatchTermination::PassLimit => {
                info!("autorouter finished: {:?}", termination)
            }
            _ => warn!("autorouter stopped early: {:?}", termination),
        }

        self.air_line = None;
        self.termination = Some(termination);
        termination
    }

    /// Swaps in the best board of the history if it beats the current one.
    fn restore_best_board(&mut self) {
        let score = BoardStatistics::new(&self.board).normalized_score(&self.settings.scoring);

        if self.history.max_score() <= score {
            return;
        }

        if let Some(best) = self.history.restore_best_board() {
            info!(
                "restoring an earlier board scoring {:.2} instead of {:.2}",
                self.history.max_score(),
                score
            );
            self.board = best;
        }
    }
}

impl<O: AutorouterObserverTrait> Step<O, BatchTermination, RouterCounters> for BatchAutorouter {
    type Error = AutorouteError;

    fn step(
        &mut self,
        observer: &mut O,
    ) -> Result<ControlFlow<BatchTermination, RouterCounters>, AutorouteError> {
        if let Some(termination) = self.termination {
            return Ok(ControlFlow::Break(termination));
        }

        if self.stop.is_stop_requested() {
            return Ok(ControlFlow::Break(self.terminate(BatchTermination::Cancelled)));
        }

        if self.pass_no > self.settings.stop_pass_no {
            return Ok(ControlFlow::Break(self.terminate(BatchTermination::PassLimit)));
        }

        let pass_no = self.pass_no;
        observer.on_pass_start(pass_no, &self.board);
        self.history.add(&self.board);

        let traces_before = self.board.trace_ids();

        let Some(counters) = self.autoroute_pass(pass_no, observer)? else {
            return Ok(ControlFlow::Break(self.terminate(BatchTermination::Done)));
        };

        let statistics = BoardStatistics::new(&self.board);
        info!(
            "pass {}: {} routed, {} not found, {} ripped, {} incomplete, score {:.2}",
            pass_no,
            counters.routed,
            counters.not_found,
            counters.ripped,
            statistics.connections.incomplete_count,
            statistics.normalized_score(&self.settings.scoring)
        );
        observer.on_pass_end(&counters, &statistics);

        if self.save_intermediate {
            observer.on_board_snapshot(pass_no, &self.board);
        }

        if self.stop.is_stop_requested() {
            return Ok(ControlFlow::Break(self.terminate(BatchTermination::Cancelled)));
        }

        let difference = diff_traces(&traces_before, &self.board);

        if self.record_trace_difference(pass_no, difference) {
            return Ok(ControlFlow::Break(self.terminate(BatchTermination::PlateauStop)));
        }

        if self.record_state() {
            warn!("pass {}: board state recurred, routing is oscillating", pass_no);
            return Ok(ControlFlow::Break(self.terminate(BatchTermination::CycleDetected)));
        }

        self.pass_no += 1;
        Ok(ControlFlow::Continue(counters))
    }
}

impl<O> Abort<O> for BatchAutorouter {
    fn abort(&mut self, _observer: &mut O) {
        self.stop.request_stop();
    }
}
