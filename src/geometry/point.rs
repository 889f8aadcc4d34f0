use std::ops::{Add, Neg, Sub};

use geo::{EuclideanDistance, Point};
use serde::{Deserialize, Serialize};

pub type FloatPoint = Point<f64>;

/// A point with integer board coordinates.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct IntPoint {
    pub x: i64,
    pub y: i64,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct IntVector {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    OnTheLeft,
    OnTheRight,
    Collinear,
}

/// Direction classes routing prefers: axis-parallel, 45 degree, or anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectionClass {
    Orthogonal,
    Diagonal,
    Any,
}

impl IntPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn to_float(self) -> FloatPoint {
        Point::new(self.x as f64, self.y as f64)
    }

    pub fn distance(&self, other: &IntPoint) -> f64 {
        self.to_float().euclidean_distance(&other.to_float())
    }

    /// Orientation of `self` relative to the directed line `from -> to`.
    pub fn side_of(&self, from: IntPoint, to: IntPoint) -> Side {
        (to - from).side_of(*self - from)
    }

    /// Exact test whether `self` lies on the closed segment `from`, `to`.
    pub fn is_on_segment(&self, from: IntPoint, to: IntPoint) -> bool {
        if self.side_of(from, to) != Side::Collinear {
            return false;
        }

        self.x >= from.x.min(to.x)
            && self.x <= from.x.max(to.x)
            && self.y >= from.y.min(to.y)
            && self.y <= from.y.max(to.y)
    }

    /// Same as `is_on_segment`, excluding the two end points.
    pub fn is_inside_segment(&self, from: IntPoint, to: IntPoint) -> bool {
        *self != from && *self != to && self.is_on_segment(from, to)
    }

    pub fn distance_to_segment(&self, from: IntPoint, to: IntPoint) -> f64 {
        self.to_float()
            .euclidean_distance(&geo::Line::new(from.to_float(), to.to_float()))
    }

    /// The point of the segment `from`, `to` nearest to `self`, rounded to the grid.
    pub fn projection_to_segment(&self, from: IntPoint, to: IntPoint) -> IntPoint {
        let direction = to - from;
        let length_square = direction.scalar_product(direction);

        if length_square == 0 {
            return from;
        }

        let t = ((*self - from).scalar_product(direction) as f64 / length_square as f64)
            .clamp(0.0, 1.0);

        IntPoint::new(
            from.x + (t * direction.x as f64).round() as i64,
            from.y + (t * direction.y as f64).round() as i64,
        )
    }
}

impl Sub for IntPoint {
    type Output = IntVector;

    fn sub(self, other: IntPoint) -> IntVector {
        IntVector::new(self.x - other.x, self.y - other.y)
    }
}

impl Add<IntVector> for IntPoint {
    type Output = IntPoint;

    fn add(self, vector: IntVector) -> IntPoint {
        IntPoint::new(self.x + vector.x, self.y + vector.y)
    }
}

impl IntVector {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    pub fn determinant(&self, other: IntVector) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }

    pub fn scalar_product(&self, other: IntVector) -> i128 {
        self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128
    }

    pub fn side_of(&self, other: IntVector) -> Side {
        match self.determinant(other).signum() {
            1 => Side::OnTheLeft,
            -1 => Side::OnTheRight,
            _ => Side::Collinear,
        }
    }

    pub fn length(&self) -> f64 {
        (self.x as f64).hypot(self.y as f64)
    }

    pub fn is_orthogonal(&self) -> bool {
        (self.x == 0) != (self.y == 0)
    }

    pub fn is_diagonal(&self) -> bool {
        self.x != 0 && self.x.abs() == self.y.abs()
    }

    pub fn direction_class(&self) -> DirectionClass {
        if self.is_orthogonal() {
            DirectionClass::Orthogonal
        } else if self.is_diagonal() {
            DirectionClass::Diagonal
        } else {
            DirectionClass::Any
        }
    }
}

impl Neg for IntVector {
    type Output = IntVector;

    fn neg(self) -> IntVector {
        IntVector::new(-self.x, -self.y)
    }
}
