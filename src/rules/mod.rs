//! Clearance classes, nets and net classes of a board.

pub mod clearance;
pub mod net;
mod rules;

pub use clearance::{ClearanceError, ClearanceMatrix};
pub use net::{Net, Nets};
pub use rules::*;

pub trait AccessRules {
    fn clearance(&self, class_1: usize, class_2: usize, layer: usize) -> i64;
    fn largest_clearance(&self, class: usize, layer: usize) -> i64;
}
