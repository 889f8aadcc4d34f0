use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::geometry::point::{IntPoint, Side};

#[enum_dispatch]
pub trait TileShapeTrait {
    fn bounding_box(&self) -> IntBox;
    /// Corners in counterclockwise order, without repetitions.
    fn corners(&self) -> Vec<IntPoint>;
    /// Closed containment.
    fn contains(&self, point: IntPoint) -> bool;

    fn center(&self) -> IntPoint {
        self.bounding_box().center()
    }
}

/// A convex tile. Items, rooms and query regions are built from these.
#[enum_dispatch(TileShapeTrait)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileShape {
    Box(IntBox),
    Octagon(IntOctagon),
    Polygon(ConvexPolygon),
}

/// An axis-parallel box, `ll` being the lower left and `ur` the upper right corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntBox {
    pub ll: IntPoint,
    pub ur: IntPoint,
}

impl IntBox {
    pub fn new(ll: IntPoint, ur: IntPoint) -> Self {
        Self {
            ll: IntPoint::new(ll.x.min(ur.x), ll.y.min(ur.y)),
            ur: IntPoint::new(ll.x.max(ur.x), ll.y.max(ur.y)),
        }
    }

    pub fn from_coords(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self::new(IntPoint::new(x1, y1), IntPoint::new(x2, y2))
    }

    pub fn from_point(point: IntPoint) -> Self {
        Self {
            ll: point,
            ur: point,
        }
    }

    pub fn width(&self) -> i64 {
        self.ur.x - self.ll.x
    }

    pub fn height(&self) -> i64 {
        self.ur.y - self.ll.y
    }

    pub fn max_width(&self) -> i64 {
        self.width().max(self.height())
    }

    pub fn area(&self) -> i128 {
        self.width() as i128 * self.height() as i128
    }

    pub fn intersects(&self, other: &IntBox) -> bool {
        self.ll.x <= other.ur.x
            && other.ll.x <= self.ur.x
            && self.ll.y <= other.ur.y
            && other.ll.y <= self.ur.y
    }

    pub fn intersection(&self, other: &IntBox) -> Option<IntBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(IntBox {
            ll: IntPoint::new(self.ll.x.max(other.ll.x), self.ll.y.max(other.ll.y)),
            ur: IntPoint::new(self.ur.x.min(other.ur.x), self.ur.y.min(other.ur.y)),
        })
    }

    pub fn union(&self, other: &IntBox) -> IntBox {
        IntBox {
            ll: IntPoint::new(self.ll.x.min(other.ll.x), self.ll.y.min(other.ll.y)),
            ur: IntPoint::new(self.ur.x.max(other.ur.x), self.ur.y.max(other.ur.y)),
        }
    }

    /// Enlarges the box by `distance` on every side. A negative distance shrinks it, down to
    /// its center.
    pub fn offset(&self, distance: i64) -> IntBox {
        if distance >= 0 {
            return IntBox {
                ll: IntPoint::new(self.ll.x - distance, self.ll.y - distance),
                ur: IntPoint::new(self.ur.x + distance, self.ur.y + distance),
            };
        }

        let center = self.center();
        let shrink_x = (-distance).min(self.width() / 2);
        let shrink_y = (-distance).min(self.height() / 2);
        let shrunk = IntBox {
            ll: IntPoint::new(self.ll.x + shrink_x, self.ll.y + shrink_y),
            ur: IntPoint::new(self.ur.x - shrink_x, self.ur.y - shrink_y),
        };

        if shrunk.ll.x > shrunk.ur.x || shrunk.ll.y > shrunk.ur.y {
            IntBox::from_point(center)
        } else {
            shrunk
        }
    }

    pub fn contains_box(&self, other: &IntBox) -> bool {
        self.contains(other.ll) && self.contains(other.ur)
    }

    /// The point of the box nearest to `point`.
    pub fn clamp(&self, point: IntPoint) -> IntPoint {
        IntPoint::new(
            point.x.clamp(self.ll.x, self.ur.x),
            point.y.clamp(self.ll.y, self.ur.y),
        )
    }
}

impl TileShapeTrait for IntBox {
    fn bounding_box(&self) -> IntBox {
        *self
    }

    fn corners(&self) -> Vec<IntPoint> {
        let corners = [
            self.ll,
            IntPoint::new(self.ur.x, self.ll.y),
            self.ur,
            IntPoint::new(self.ll.x, self.ur.y),
        ];

        corners.iter().copied().dedup().unique().collect()
    }

    fn contains(&self, point: IntPoint) -> bool {
        point.x >= self.ll.x && point.x <= self.ur.x && point.y >= self.ll.y && point.y <= self.ur.y
    }

    fn center(&self) -> IntPoint {
        IntPoint::new(
            self.ll.x + self.width() / 2,
            self.ll.y + self.height() / 2,
        )
    }
}

/// An octagon bounded by the lines `lx <= x <= rx`, `ly <= y <= uy`, `ulx <= x - y <= lrx`
/// and `llx <= x + y <= urx`. All intersections of these lines lie on the integer grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntOctagon {
    pub lx: i64,
    pub ly: i64,
    pub rx: i64,
    pub uy: i64,
    pub ulx: i64,
    pub lrx: i64,
    pub llx: i64,
    pub urx: i64,
}

impl IntOctagon {
    /// The smallest octagon on the integer grid containing the circle around `center`.
    pub fn around(center: IntPoint, radius: i64) -> Self {
        let diagonal = diagonal_offset(radius);

        Self {
            lx: center.x - radius,
            ly: center.y - radius,
            rx: center.x + radius,
            uy: center.y + radius,
            ulx: center.x - center.y - diagonal,
            lrx: center.x - center.y + diagonal,
            llx: center.x + center.y - diagonal,
            urx: center.x + center.y + diagonal,
        }
        .normalize()
    }

    pub fn from_box(bbox: &IntBox) -> Self {
        Self {
            lx: bbox.ll.x,
            ly: bbox.ll.y,
            rx: bbox.ur.x,
            uy: bbox.ur.y,
            ulx: bbox.ll.x - bbox.ur.y,
            lrx: bbox.ur.x - bbox.ll.y,
            llx: bbox.ll.x + bbox.ll.y,
            urx: bbox.ur.x + bbox.ur.y,
        }
    }

    /// Enlarges the octagon so that every point within `distance` of it is contained.
    pub fn offset(&self, distance: i64) -> Self {
        let diagonal = diagonal_offset(distance);

        Self {
            lx: self.lx - distance,
            ly: self.ly - distance,
            rx: self.rx + distance,
            uy: self.uy + distance,
            ulx: self.ulx - diagonal,
            lrx: self.lrx + diagonal,
            llx: self.llx - diagonal,
            urx: self.urx + diagonal,
        }
        .normalize()
    }

    /// Tightens the diagonal bounds so that no diagonal lies outside the bounding box.
    fn normalize(mut self) -> Self {
        self.ulx = self.ulx.max(self.lx - self.uy);
        self.lrx = self.lrx.min(self.rx - self.ly);
        self.llx = self.llx.max(self.lx + self.ly);
        self.urx = self.urx.min(self.rx + self.uy);
        self
    }
}

impl TileShapeTrait for IntOctagon {
    fn bounding_box(&self) -> IntBox {
        IntBox::from_coords(self.lx, self.ly, self.rx, self.uy)
    }

    fn corners(&self) -> Vec<IntPoint> {
        let corners = [
            IntPoint::new(self.lx, self.llx - self.lx),
            IntPoint::new(self.llx - self.ly, self.ly),
            IntPoint::new(self.lrx + self.ly, self.ly),
            IntPoint::new(self.rx, self.rx - self.lrx),
            IntPoint::new(self.rx, self.urx - self.rx),
            IntPoint::new(self.urx - self.uy, self.uy),
            IntPoint::new(self.ulx + self.uy, self.uy),
            IntPoint::new(self.lx, self.lx - self.ulx),
        ];

        corners.iter().copied().dedup().unique().collect()
    }

    fn contains(&self, point: IntPoint) -> bool {
        let diff = point.x - point.y;
        let sum = point.x + point.y;

        point.x >= self.lx
            && point.x <= self.rx
            && point.y >= self.ly
            && point.y <= self.uy
            && diff >= self.ulx
            && diff <= self.lrx
            && sum >= self.llx
            && sum <= self.urx
    }
}

/// A convex polygon with counterclockwise corners.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConvexPolygon {
    corners: Vec<IntPoint>,
}

impl ConvexPolygon {
    /// Builds the convex hull of `points`.
    pub fn new(points: impl IntoIterator<Item = IntPoint>) -> Self {
        let mut points: Vec<IntPoint> = points.into_iter().collect();
        points.sort_unstable();
        points.dedup();

        if points.len() < 3 {
            return Self { corners: points };
        }

        // Andrew's monotone chain.
        let mut lower: Vec<IntPoint> = vec![];
        for &point in points.iter() {
            while lower.len() >= 2
                && point.side_of(lower[lower.len() - 2], lower[lower.len() - 1]) != Side::OnTheLeft
            {
                lower.pop();
            }
            lower.push(point);
        }

        let mut upper: Vec<IntPoint> = vec![];
        for &point in points.iter().rev() {
            while upper.len() >= 2
                && point.side_of(upper[upper.len() - 2], upper[upper.len() - 1]) != Side::OnTheLeft
            {
                upper.pop();
            }
            upper.push(point);
        }

        lower.pop();
        upper.pop();
        lower.extend(upper);

        Self { corners: lower }
    }
}

impl TileShapeTrait for ConvexPolygon {
    fn bounding_box(&self) -> IntBox {
        let (min_x, max_x) = self
            .corners
            .iter()
            .map(|corner| corner.x)
            .minmax()
            .into_option()
            .unwrap_or((0, 0));
        let (min_y, max_y) = self
            .corners
            .iter()
            .map(|corner| corner.y)
            .minmax()
            .into_option()
            .unwrap_or((0, 0));

        IntBox::from_coords(min_x, min_y, max_x, max_y)
    }

    fn corners(&self) -> Vec<IntPoint> {
        self.corners.clone()
    }

    fn contains(&self, point: IntPoint) -> bool {
        match self.corners.len() {
            0 => false,
            1 => self.corners[0] == point,
            2 => point.is_on_segment(self.corners[0], self.corners[1]),
            count => (0..count).all(|i| {
                point.side_of(self.corners[i], self.corners[(i + 1) % count]) != Side::OnTheRight
            }),
        }
    }
}

/// Offset of the diagonal bounds needed to keep an orthogonal distance of `distance`,
/// rounded up.
fn diagonal_offset(distance: i64) -> i64 {
    (distance as f64 * std::f64::consts::SQRT_2).ceil() as i64
}
