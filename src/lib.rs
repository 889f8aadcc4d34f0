pub mod autoroute;
pub mod board;
pub mod debug;
pub mod geometry;
pub mod graph;
pub mod rules;
pub mod settings;
pub mod stepper;
