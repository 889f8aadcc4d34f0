//! The board model: items, their undoable store and spatial index, and net connectivity.

mod board;
pub mod connectivity;
pub mod item;
pub mod search_tree;
pub mod statistics;
pub mod trace;
pub mod undo;

pub use board::*;
