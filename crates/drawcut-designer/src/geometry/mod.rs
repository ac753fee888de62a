//! Geometry kernel.
//!
//! Planar primitives used by the outliner: points and contours, polygon
//! predicates, the loop splitter for self-intersecting rings, and the
//! area model built on `cavalier_contours` offsets and booleans.

mod area;
mod polygon;

pub use area::{boundary_of, buffer_path, fill_area, union_areas, Area, CENTERLINE_TOLERANCE};
pub use polygon::{
    distance_to_segment, point_in_polygon, segment_intersection, signed_area,
    split_simple_loops,
};

use serde::{Deserialize, Serialize};

/// A point in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A closed polygon; the closing edge from the last point back to the first
/// is implicit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First point, where a trace of the contour starts and ends.
    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    /// Shoelace area; positive when counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    pub fn contains(&self, p: &Point) -> bool {
        point_in_polygon(p, &self.points)
    }

    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        bounds(self.points.iter())
    }

    /// The same ring traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    /// Apply `f` to every point.
    pub fn map_points(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            points: self.points.iter().map(|p| f(*p)).collect(),
        }
    }
}

impl From<Vec<Point>> for Contour {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

/// Bounding box `(min_x, min_y, max_x, max_y)` of a point set.
pub fn bounds<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<(f64, f64, f64, f64)> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let init = (first.x, first.y, first.x, first.y);
    Some(iter.fold(init, |(min_x, min_y, max_x, max_y), p| {
        (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
    }))
}
