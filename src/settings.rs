//! Resolved router configuration.
//!
//! Settings arrive as one immutable value. Every field has a default, so partial JSON files
//! load; merging several sources is left to the caller.

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{autoroute::control::ExpansionCostFactor, board::RoutingBoard};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferredDirection {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerRouteSettings {
    pub active: bool,
    pub preferred_direction: PreferredDirection,
    pub preferred_cost: f64,
    pub against_preferred_cost: f64,
}

impl Default for LayerRouteSettings {
    fn default() -> Self {
        Self {
            active: true,
            preferred_direction: PreferredDirection::Horizontal,
            preferred_cost: 1.0,
            against_preferred_cost: 1.0,
        }
    }
}

impl LayerRouteSettings {
    pub fn cost_factor(&self) -> ExpansionCostFactor {
        match self.preferred_direction {
            PreferredDirection::Horizontal => {
                ExpansionCostFactor::new(self.preferred_cost, self.against_preferred_cost)
            }
            PreferredDirection::Vertical => {
                ExpansionCostFactor::new(self.against_preferred_cost, self.preferred_cost)
            }
        }
    }
}

/// Diminishing-returns detection over the per-pass trace difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateauSettings {
    pub window: usize,
    pub window_growth: usize,
    pub window_ceiling: usize,
    pub threshold: f64,
}

impl Default for PlateauSettings {
    fn default() -> Self {
        Self {
            window: 20,
            window_growth: 20,
            window_ceiling: 200,
            threshold: 20.0,
        }
    }
}

/// Route optimization after routing: rip up and reroute item by item, keep what scores better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub max_passes: usize,
    /// Routing passes spent rerouting the connections of one ripped item.
    pub max_item_passes: usize,
    /// Multiplies the ripup costs until a pass improves nothing.
    pub start_ripup_factor: u32,
    /// A pass raising the normalized score by less than this ends optimization.
    pub improvement_threshold: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_passes: 100,
            max_item_passes: 6,
            start_ripup_factor: 10,
            improvement_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub unrouted_net_penalty: f64,
    pub clearance_violation_penalty: f64,
    pub bend_penalty: f64,
    pub trace_length_cost: f64,
    pub via_cost: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            unrouted_net_penalty: 4000.0,
            clearance_violation_penalty: 1000.0,
            bend_penalty: 10.0,
            trace_length_cost: 0.0001,
            via_cost: 50.0,
        }
    }
}

/// How much checking and instrumentation a run does. Tail cleanup is skipped at
/// `AllDebugging` so intermediate routing stays visible.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestLevel {
    #[default]
    ReleaseVersion,
    CriticalDebugging,
    ImportantDebugging,
    AllDebugging,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub single_step: bool,
    pub trace_insertion_delay_ms: u64,
    /// Names (or `Net #N` references) of the nets debug control stops at. Empty means all.
    pub net_filter: Vec<String>,
    pub test_level: TestLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    pub start_pass_no: usize,
    pub stop_pass_no: usize,
    pub via_costs: u32,
    pub plane_via_costs: u32,
    pub start_ripup_costs: u32,
    pub vias_allowed: bool,
    pub remove_unconnected_vias: bool,
    pub with_preferred_directions: bool,
    pub layers: Vec<LayerRouteSettings>,
    pub connection_time_limit_ms: u64,
    pub history_capacity: usize,
    pub plateau: PlateauSettings,
    pub optimizer: OptimizerSettings,
    pub scoring: ScoringSettings,
    pub debug: DebugSettings,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            start_pass_no: 1,
            stop_pass_no: 999,
            via_costs: 50,
            plane_via_costs: 5,
            start_ripup_costs: 100,
            vias_allowed: true,
            remove_unconnected_vias: true,
            with_preferred_directions: true,
            layers: vec![],
            connection_time_limit_ms: 100_000,
            history_capacity: 20,
            plateau: PlateauSettings::default(),
            optimizer: OptimizerSettings::default(),
            scoring: ScoringSettings::default(),
            debug: DebugSettings::default(),
        }
    }
}

impl RouterSettings {
    /// Default settings with per-layer costs derived from the board's shape and layer stack.
    ///
    /// Signal layers alternate preferred directions, starting across the board's short side.
    /// Going against the preferred direction costs more the more elongated the board is,
    /// and with more than two signal layers the outer layers cost extra.
    pub fn for_board(board: &RoutingBoard) -> Self {
        let bbox = board.bounding_box();
        let horizontal_width = bbox.width().max(1) as f64;
        let vertical_width = bbox.height().max(1) as f64;

        let horizontal_add_cost = 0.1 * (10.0 * horizontal_width / vertical_width).round();
        let vertical_add_cost = 0.1 * (10.0 * vertical_width / horizontal_width).round();

        let mut is_horizontal = horizontal_width < vertical_width;
        let mut layers: Vec<LayerRouteSettings> = board
            .layers()
            .iter()
            .map(|layer| {
                if layer.is_signal {
                    is_horizontal = !is_horizontal;
                }

                let (preferred_direction, add_cost) = if is_horizontal {
                    (PreferredDirection::Horizontal, horizontal_add_cost)
                } else {
                    (PreferredDirection::Vertical, vertical_add_cost)
                };

                LayerRouteSettings {
                    active: layer.is_signal,
                    preferred_direction,
                    preferred_cost: 1.0,
                    against_preferred_cost: 1.0 + add_cost,
                }
            })
            .collect();

        let signal_layer_count = board.signal_layer_count();

        if signal_layer_count > 2 {
            let outer_add_cost = 0.2 * signal_layer_count as f64;
            let last = layers.len() - 1;

            for layer in [0, last] {
                layers[layer].preferred_cost += outer_add_cost;
                layers[layer].against_preferred_cost += outer_add_cost;
            }
        }

        Self {
            layers,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Settings of `layer`; layers not listed use the defaults.
    pub fn layer(&self, layer: usize) -> LayerRouteSettings {
        self.layers.get(layer).cloned().unwrap_or_default()
    }

    pub fn is_layer_active(&self, layer: usize) -> bool {
        self.layer(layer).active
    }

    /// Per-layer expansion cost factors. Without preferred directions every direction
    /// costs the same.
    pub fn trace_costs(&self, layer_count: usize) -> Vec<ExpansionCostFactor> {
        (0..layer_count)
            .map(|layer| {
                if self.with_preferred_directions {
                    self.layer(layer).cost_factor()
                } else {
                    ExpansionCostFactor::new(1.0, 1.0)
                }
            })
            .collect()
    }

    /// Deadline budget of one connection search in pass `pass_no`: it doubles every pass.
    pub fn connection_time_limit_ms(&self, pass_no: usize) -> u64 {
        let exponent = pass_no.saturating_sub(1).min(32) as u32;
        self.connection_time_limit_ms
            .saturating_mul(1u64 << exponent)
    }
}
