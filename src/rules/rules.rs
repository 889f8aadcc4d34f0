use serde::{Deserialize, Serialize};

use crate::rules::{
    clearance::ClearanceMatrix,
    net::{Net, Nets},
    AccessRules,
};

/// Trace and via dimensions shared by the nets of a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetClass {
    pub name: String,
    pub trace_half_width: i64,
    pub trace_clearance_class: usize,
    pub via_radius: i64,
    pub via_clearance_class: usize,
}

#[derive(Debug, Clone)]
pub struct BoardRules {
    pub clearance_matrix: ClearanceMatrix,
    pub nets: Nets,
    net_classes: Vec<NetClass>,
}

impl BoardRules {
    /// Class 0 is the fallback for nets whose class is unknown.
    ///
    /// # Panics
    ///
    /// Panics if `net_classes` is empty. Boards loaded from a description check this first.
    pub fn new(clearance_matrix: ClearanceMatrix, nets: Nets, net_classes: Vec<NetClass>) -> Self {
        assert!(!net_classes.is_empty(), "board rules need a default net class");

        Self {
            clearance_matrix,
            nets,
            net_classes,
        }
    }

    pub fn net_classes(&self) -> &[NetClass] {
        &self.net_classes
    }

    pub fn net_class(&self, net_no: usize) -> &NetClass {
        self.nets
            .net(net_no)
            .and_then(|net| self.net_classes.get(net.net_class))
            .unwrap_or(&self.net_classes[0])
    }

    pub fn net(&self, net_no: usize) -> Option<&Net> {
        self.nets.net(net_no)
    }

    pub fn layer_count(&self) -> usize {
        self.clearance_matrix.layer_count()
    }
}

impl AccessRules for BoardRules {
    fn clearance(&self, class_1: usize, class_2: usize, layer: usize) -> i64 {
        self.clearance_matrix.value(class_1, class_2, layer)
    }

    fn largest_clearance(&self, class: usize, layer: usize) -> i64 {
        self.clearance_matrix.max_value_on_layer(class, layer)
    }
}
