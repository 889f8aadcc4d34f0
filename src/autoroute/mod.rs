//! Maze-expansion routing of single connections and the batch passes built on it.

pub mod batch;
pub mod control;
pub mod engine;
pub mod history;
pub mod insert;
pub mod job;
pub mod locate;
pub mod maze;
pub mod observer;
pub mod optimize;
pub mod plateau;
pub mod room;
pub mod stop;

pub use batch::{AirLine, BatchAutorouter, BatchTermination, RoutingStatus};
pub use engine::{autoroute_connection, AutorouteError, AutorouteResult};
pub use optimize::{OptimizeTermination, RouteOptimizer};
