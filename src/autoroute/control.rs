use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{board::RoutingBoard, settings::RouterSettings};

/// Cost per unit of trace length along each axis of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpansionCostFactor {
    pub horizontal: f64,
    pub vertical: f64,
}

impl ExpansionCostFactor {
    pub fn new(horizontal: f64, vertical: f64) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub fn min(&self) -> f64 {
        self.horizontal.min(self.vertical)
    }
}

/// Parameters of one connection search, resolved from the settings, the net's class and
/// the current pass.
#[derive(Debug, Clone)]
pub struct AutorouteControl {
    pub net_no: usize,
    pub layer_active: Vec<bool>,
    pub trace_half_width: Vec<i64>,
    pub trace_clearance_class: usize,
    pub via_radius: i64,
    pub via_clearance_class: usize,
    pub vias_allowed: bool,
    /// Cost of one via, already scaled by the via radius.
    pub via_cost: f64,
    pub trace_costs: Vec<ExpansionCostFactor>,
    pub ripup_allowed: bool,
    /// Cost of ripping up an item, per unit of its half width.
    pub ripup_costs: f64,
    pub remove_unconnected_vias: bool,
    pub deadline: Option<Instant>,
}

impl AutorouteControl {
    pub fn new(board: &RoutingBoard, net_no: usize, settings: &RouterSettings) -> Self {
        let layer_count = board.layer_count();
        let net_class = board.rules().net_class(net_no);

        let layer_active: Vec<bool> = (0..layer_count)
            .map(|layer| {
                board.layers()[layer].is_signal && settings.is_layer_active(layer)
            })
            .collect();

        let via_costs = if board.rules().nets.contains_plane(net_no) {
            settings.plane_via_costs
        } else {
            settings.via_costs
        };

        Self {
            net_no,
            vias_allowed: settings.vias_allowed
                && layer_active.iter().filter(|active| **active).count() > 1,
            layer_active,
            trace_half_width: vec![net_class.trace_half_width; layer_count],
            trace_clearance_class: net_class.trace_clearance_class,
            via_radius: net_class.via_radius,
            via_clearance_class: net_class.via_clearance_class,
            via_cost: via_costs as f64 * net_class.via_radius.max(1) as f64,
            trace_costs: settings.trace_costs(layer_count),
            ripup_allowed: false,
            ripup_costs: settings.start_ripup_costs as f64,
            remove_unconnected_vias: settings.remove_unconnected_vias,
            deadline: None,
        }
    }

    pub fn with_ripup(mut self, ripup_costs: f64) -> Self {
        self.ripup_allowed = true;
        self.ripup_costs = ripup_costs;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn max_trace_half_width(&self) -> i64 {
        self.trace_half_width.iter().copied().max().unwrap_or(0)
    }

    pub fn is_past_deadline(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }
}
