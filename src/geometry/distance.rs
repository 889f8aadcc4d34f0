use serde::{Deserialize, Serialize};

use crate::geometry::{
    point::{IntPoint, Side},
    shape::{IntBox, TileShape, TileShapeTrait},
};

/// The footprint of an item on one layer: either a convex tile or a segment thickened by its
/// half width. Distances between footprints are gaps: zero when they touch or overlap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemShape {
    Tile(TileShape),
    Segment {
        from: IntPoint,
        to: IntPoint,
        half_width: i64,
    },
}

impl ItemShape {
    pub fn point(point: IntPoint, half_width: i64) -> Self {
        ItemShape::Segment {
            from: point,
            to: point,
            half_width,
        }
    }

    pub fn bounding_box(&self) -> IntBox {
        match self {
            ItemShape::Tile(tile) => tile.bounding_box(),
            ItemShape::Segment {
                from,
                to,
                half_width,
            } => IntBox::new(*from, *to).offset(*half_width),
        }
    }

    pub fn distance(&self, other: &ItemShape) -> f64 {
        let gap = match (self, other) {
            (ItemShape::Tile(tile), ItemShape::Tile(other_tile)) => {
                tile_tile_distance(tile, other_tile)
            }
            (
                ItemShape::Tile(tile),
                ItemShape::Segment {
                    from,
                    to,
                    half_width,
                },
            )
            | (
                ItemShape::Segment {
                    from,
                    to,
                    half_width,
                },
                ItemShape::Tile(tile),
            ) => tile_segment_distance(tile, *from, *to) - *half_width as f64,
            (
                ItemShape::Segment {
                    from,
                    to,
                    half_width,
                },
                ItemShape::Segment {
                    from: other_from,
                    to: other_to,
                    half_width: other_half_width,
                },
            ) => {
                segment_segment_distance(*from, *to, *other_from, *other_to)
                    - *half_width as f64
                    - *other_half_width as f64
            }
        };

        gap.max(0.0)
    }

    pub fn intersects(&self, other: &ItemShape) -> bool {
        self.distance(other) <= 0.0
    }
}

impl From<TileShape> for ItemShape {
    fn from(tile: TileShape) -> Self {
        ItemShape::Tile(tile)
    }
}

impl From<IntBox> for ItemShape {
    fn from(bbox: IntBox) -> Self {
        ItemShape::Tile(TileShape::Box(bbox))
    }
}

/// Exact test whether the closed segments `a` and `b` share a point.
pub fn segments_intersect(a_from: IntPoint, a_to: IntPoint, b_from: IntPoint, b_to: IntPoint) -> bool {
    let side_1 = b_from.side_of(a_from, a_to);
    let side_2 = b_to.side_of(a_from, a_to);
    let side_3 = a_from.side_of(b_from, b_to);
    let side_4 = a_to.side_of(b_from, b_to);

    if side_1 != side_2
        && side_3 != side_4
        && side_1 != Side::Collinear
        && side_2 != Side::Collinear
        && side_3 != Side::Collinear
        && side_4 != Side::Collinear
    {
        return true;
    }

    b_from.is_on_segment(a_from, a_to)
        || b_to.is_on_segment(a_from, a_to)
        || a_from.is_on_segment(b_from, b_to)
        || a_to.is_on_segment(b_from, b_to)
}

/// The point where segments `a` and `b` cross, if they cross in exactly one point and that
/// point has integer coordinates.
pub fn segment_crossing(
    a_from: IntPoint,
    a_to: IntPoint,
    b_from: IntPoint,
    b_to: IntPoint,
) -> Option<IntPoint> {
    let a = a_to - a_from;
    let b = b_to - b_from;
    let denominator = a.determinant(b);

    if denominator == 0 {
        return None;
    }

    let offset = b_from - a_from;
    let (mut t, mut u, mut denominator) = (offset.determinant(b), offset.determinant(a), denominator);

    if denominator < 0 {
        t = -t;
        u = -u;
        denominator = -denominator;
    }

    if t < 0 || t > denominator || u < 0 || u > denominator {
        return None;
    }

    let x = a.x as i128 * t;
    let y = a.y as i128 * t;

    if x % denominator != 0 || y % denominator != 0 {
        return None;
    }

    Some(IntPoint::new(
        a_from.x + (x / denominator) as i64,
        a_from.y + (y / denominator) as i64,
    ))
}

pub fn segment_segment_distance(
    a_from: IntPoint,
    a_to: IntPoint,
    b_from: IntPoint,
    b_to: IntPoint,
) -> f64 {
    if segments_intersect(a_from, a_to, b_from, b_to) {
        return 0.0;
    }

    a_from
        .distance_to_segment(b_from, b_to)
        .min(a_to.distance_to_segment(b_from, b_to))
        .min(b_from.distance_to_segment(a_from, a_to))
        .min(b_to.distance_to_segment(a_from, a_to))
}

fn edges(corners: &[IntPoint]) -> impl Iterator<Item = (IntPoint, IntPoint)> + '_ {
    (0..corners.len()).map(move |i| (corners[i], corners[(i + 1) % corners.len()]))
}

pub fn tile_segment_distance(tile: &TileShape, from: IntPoint, to: IntPoint) -> f64 {
    if tile.contains(from) || tile.contains(to) {
        return 0.0;
    }

    let corners = tile.corners();

    edges(&corners)
        .map(|(corner_from, corner_to)| segment_segment_distance(from, to, corner_from, corner_to))
        .fold(f64::INFINITY, f64::min)
}

pub fn tile_tile_distance(tile: &TileShape, other: &TileShape) -> f64 {
    if let (TileShape::Box(bbox), TileShape::Box(other_bbox)) = (tile, other) {
        return box_box_distance(bbox, other_bbox);
    }

    let corners = tile.corners();
    let other_corners = other.corners();

    if corners.iter().any(|corner| other.contains(*corner))
        || other_corners.iter().any(|corner| tile.contains(*corner))
    {
        return 0.0;
    }

    edges(&corners)
        .flat_map(|(from, to)| {
            edges(&other_corners)
                .map(move |(other_from, other_to)| {
                    segment_segment_distance(from, to, other_from, other_to)
                })
        })
        .fold(f64::INFINITY, f64::min)
}

pub fn box_box_distance(bbox: &IntBox, other: &IntBox) -> f64 {
    let dx = (other.ll.x - bbox.ur.x).max(bbox.ll.x - other.ur.x).max(0);
    let dy = (other.ll.y - bbox.ur.y).max(bbox.ll.y - other.ur.y).max(0);

    (dx as f64).hypot(dy as f64)
}
