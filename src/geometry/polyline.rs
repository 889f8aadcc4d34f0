use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::geometry::{
    point::IntPoint,
    shape::IntBox,
};

/// A chain of straight segments through integer corners. Consecutive duplicate corners and
/// corners lying straight between their neighbours are dropped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Polyline {
    corners: Vec<IntPoint>,
}

impl Polyline {
    pub fn new(corners: impl IntoIterator<Item = IntPoint>) -> Self {
        let mut normalized: Vec<IntPoint> = vec![];

        for corner in corners {
            if normalized.last() == Some(&corner) {
                continue;
            }

            if normalized.len() >= 2 {
                let prev = normalized[normalized.len() - 1];
                let prev_prev = normalized[normalized.len() - 2];

                if prev.is_inside_segment(prev_prev, corner) {
                    normalized.pop();
                }
            }

            normalized.push(corner);
        }

        Self {
            corners: normalized,
        }
    }

    pub fn corners(&self) -> &[IntPoint] {
        &self.corners
    }

    pub fn corner_count(&self) -> usize {
        self.corners.len()
    }

    pub fn is_degenerate(&self) -> bool {
        self.corners.len() < 2
    }

    pub fn first_corner(&self) -> IntPoint {
        self.corners[0]
    }

    pub fn last_corner(&self) -> IntPoint {
        self.corners[self.corners.len() - 1]
    }

    pub fn segments(&self) -> impl Iterator<Item = (IntPoint, IntPoint)> + '_ {
        self.corners.iter().copied().tuple_windows()
    }

    pub fn segment_count(&self) -> usize {
        self.corners.len().saturating_sub(1)
    }

    /// Number of corners where the direction changes.
    pub fn bend_count(&self) -> usize {
        self.corners.len().saturating_sub(2)
    }

    pub fn length(&self) -> f64 {
        self.segments().map(|(from, to)| from.distance(&to)).sum()
    }

    pub fn bounding_box(&self) -> IntBox {
        self.corners
            .iter()
            .skip(1)
            .fold(IntBox::from_point(self.first_corner()), |bbox, corner| {
                bbox.union(&IntBox::from_point(*corner))
            })
    }

    pub fn reverse(&self) -> Polyline {
        Polyline {
            corners: self.corners.iter().rev().copied().collect(),
        }
    }

    pub fn contains_point(&self, point: IntPoint) -> bool {
        self.segments()
            .any(|(from, to)| point.is_on_segment(from, to))
    }

    /// Splits at `point` if it lies on the polyline strictly between its two ends.
    pub fn split_at(&self, point: IntPoint) -> Option<(Polyline, Polyline)> {
        if point == self.first_corner() || point == self.last_corner() {
            return None;
        }

        let (index, (from, to)) = self
            .segments()
            .enumerate()
            .find(|(_, (from, to))| point.is_on_segment(*from, *to))?;

        let mut first: Vec<IntPoint> = self.corners[..=index].to_vec();
        let mut second: Vec<IntPoint> = vec![point];

        if point != from {
            first.push(point);
        }

        if point == to {
            second.extend_from_slice(&self.corners[index + 2..]);
        } else {
            second.extend_from_slice(&self.corners[index + 1..]);
        }

        Some((Polyline::new(first), Polyline::new(second)))
    }

    /// Joins `other` to whichever end of `self` it shares, if any.
    pub fn combine(&self, other: &Polyline) -> Option<Polyline> {
        let (head, tail) = if self.last_corner() == other.first_corner() {
            (self.clone(), other.clone())
        } else if self.last_corner() == other.last_corner() {
            (self.clone(), other.reverse())
        } else if self.first_corner() == other.last_corner() {
            (other.clone(), self.clone())
        } else if self.first_corner() == other.first_corner() {
            (other.reverse(), self.clone())
        } else {
            return None;
        };

        Some(Polyline::new(
            head.corners.into_iter().chain(tail.corners.into_iter().skip(1)),
        ))
    }

    /// Whether every segment of `self` lies on some segment of `other`.
    pub fn is_covered_by(&self, other: &Polyline) -> bool {
        self.segments().all(|(from, to)| {
            other.segments().any(|(other_from, other_to)| {
                from.is_on_segment(other_from, other_to) && to.is_on_segment(other_from, other_to)
            })
        })
    }
}
