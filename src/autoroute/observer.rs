use serde::{Deserialize, Serialize};

use crate::board::{statistics::BoardStatistics, RoutingBoard};

/// Counters of one pass, reported to observers after every connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterCounters {
    pub pass_no: usize,
    pub queued: usize,
    pub routed: usize,
    pub not_found: usize,
    pub already_connected: usize,
    pub skipped: usize,
    pub ripped: usize,
}

/// Receives progress of a batch autorouter. Every method defaults to doing nothing.
pub trait AutorouterObserverTrait {
    fn on_pass_start(&mut self, _pass_no: usize, _board: &RoutingBoard) {}
    fn on_connection(&mut self, _counters: &RouterCounters, _net_no: usize) {}
    fn on_pass_end(&mut self, _counters: &RouterCounters, _statistics: &BoardStatistics) {}
    /// Called with a copy of the board after a pass when intermediate boards are requested.
    fn on_board_snapshot(&mut self, _pass_no: usize, _board: &RoutingBoard) {}
}

pub struct EmptyAutorouterObserver;

impl AutorouterObserverTrait for EmptyAutorouterObserver {}
