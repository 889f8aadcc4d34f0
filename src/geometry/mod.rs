//! Integer board geometry: points, convex tiles, polylines, and the exact predicates and
//! distances the search index and the maze engine are built on.

pub mod distance;
pub mod point;
pub mod polyline;
pub mod shape;

pub use distance::ItemShape;
pub use point::{DirectionClass, FloatPoint, IntPoint, IntVector, Side};
pub use polyline::Polyline;
pub use shape::{ConvexPolygon, IntBox, IntOctagon, TileShape, TileShapeTrait};
