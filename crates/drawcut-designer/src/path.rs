//! Drawing paths.
//!
//! A [`DrawPath`] is an immutable sequence of move, line, curve and close
//! commands in millimetres (origin bottom-left, Y up). Paths come from the
//! drawing surface, from SVG path data or from glyph outlines, and are only
//! ever built through [`PathBuilder`], which closes every subpath.

use lyon::math::{point, Transform};
use lyon::path::iterator::PathIterator;
use lyon::path::{Event, Path};

use crate::geometry::Point;

/// Distance below which two consecutive flattened points are merged.
const DUPLICATE_EPSILON: f64 = 1e-6;

/// An immutable, closed drawing path.
#[derive(Debug, Clone)]
pub struct DrawPath {
    path: Path,
}

impl DrawPath {
    pub fn builder() -> PathBuilder {
        PathBuilder::new()
    }

    /// Closed polygon through `points`.
    pub fn from_points(points: &[Point]) -> Self {
        let mut builder = PathBuilder::new();
        if let Some((first, rest)) = points.split_first() {
            builder.move_to(first.x, first.y);
            for p in rest {
                builder.line_to(p.x, p.y);
            }
        }
        builder.build()
    }

    /// Underlying lyon path.
    pub fn as_lyon(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.path.iter().next().is_none()
    }

    /// Number of subpaths.
    pub fn subpath_count(&self) -> usize {
        self.path
            .iter()
            .filter(|event| matches!(event, Event::Begin { .. }))
            .count()
    }

    /// Flatten every subpath into a polygon.
    ///
    /// Curves are replaced by chords deviating at most `tolerance` from the
    /// curve. Consecutive duplicate points and the closing repeat are removed;
    /// subpaths with fewer than three distinct points are dropped.
    pub fn flatten(&self, tolerance: f64) -> Vec<Vec<Point>> {
        let mut polygons = Vec::new();
        let mut current: Vec<Point> = Vec::new();

        for event in self.path.iter().flattened(tolerance as f32) {
            match event {
                Event::Begin { at } => {
                    current.clear();
                    current.push(Point::new(at.x as f64, at.y as f64));
                }
                Event::Line { to, .. } => {
                    current.push(Point::new(to.x as f64, to.y as f64));
                }
                Event::End { .. } => {
                    let polygon = dedup_closed(std::mem::take(&mut current));
                    if polygon.len() >= 3 {
                        polygons.push(polygon);
                    }
                }
                _ => {}
            }
        }

        polygons
    }

    /// Bounding box of the flattened path as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self, tolerance: f64) -> Option<(f64, f64, f64, f64)> {
        let polygons = self.flatten(tolerance);
        crate::geometry::bounds(polygons.iter().flatten())
    }

    /// A copy of the path with every point mapped through `transform`.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            path: self.path.clone().transformed(transform),
        }
    }
}

/// Merge consecutive duplicates and drop the closing repeat of a ring.
pub(crate) fn dedup_closed(mut points: Vec<Point>) -> Vec<Point> {
    points.dedup_by(|b, a| a.distance_to(b) < DUPLICATE_EPSILON);
    while points.len() > 1 {
        let first = points[0];
        match points.last() {
            Some(last) if last.distance_to(&first) < DUPLICATE_EPSILON => {
                points.pop();
            }
            _ => break,
        }
    }
    points
}

/// Builder for [`DrawPath`].
///
/// Commands issued before the first `move_to` start a subpath at the
/// current point (the origin initially). `build` closes any open subpath.
pub struct PathBuilder {
    inner: lyon::path::path::Builder,
    current: Point,
    start: Point,
    open: bool,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self {
            inner: Path::builder(),
            current: Point::new(0.0, 0.0),
            start: Point::new(0.0, 0.0),
            open: false,
        }
    }

    fn ensure_open(&mut self) {
        if !self.open {
            self.inner
                .begin(point(self.current.x as f32, self.current.y as f32));
            self.start = self.current;
            self.open = true;
        }
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        if self.open {
            self.inner.end(true);
        }
        self.inner.begin(point(x as f32, y as f32));
        self.open = true;
        self.current = Point::new(x, y);
        self.start = self.current;
        self
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.ensure_open();
        self.inner.line_to(point(x as f32, y as f32));
        self.current = Point::new(x, y);
        self
    }

    pub fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) -> &mut Self {
        self.ensure_open();
        self.inner
            .quadratic_bezier_to(point(cx as f32, cy as f32), point(x as f32, y as f32));
        self.current = Point::new(x, y);
        self
    }

    pub fn cubic_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) -> &mut Self {
        self.ensure_open();
        self.inner.cubic_bezier_to(
            point(c1x as f32, c1y as f32),
            point(c2x as f32, c2y as f32),
            point(x as f32, y as f32),
        );
        self.current = Point::new(x, y);
        self
    }

    /// Close the current subpath; the pen returns to its start.
    pub fn close(&mut self) -> &mut Self {
        if self.open {
            self.inner.end(true);
            self.open = false;
            self.current = self.start;
        }
        self
    }

    pub fn build(mut self) -> DrawPath {
        if self.open {
            self.inner.end(true);
        }
        DrawPath {
            path: self.inner.build(),
        }
    }
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl rusttype::OutlineBuilder for PathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        PathBuilder::move_to(self, x as f64, y as f64);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        PathBuilder::line_to(self, x as f64, y as f64);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        PathBuilder::quad_to(self, x1 as f64, y1 as f64, x as f64, y as f64);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        PathBuilder::cubic_to(
            self, x1 as f64, y1 as f64, x2 as f64, y2 as f64, x as f64, y as f64,
        );
    }

    fn close(&mut self) {
        PathBuilder::close(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_closes_open_subpath() {
        let mut builder = DrawPath::builder();
        builder.move_to(0.0, 0.0).line_to(10.0, 0.0).line_to(10.0, 10.0);
        let path = builder.build();

        let polygons = path.flatten(0.1);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].len(), 3);
        assert!(path
            .as_lyon()
            .iter()
            .any(|e| matches!(e, Event::End { close: true, .. })));
    }

    #[test]
    fn test_flatten_drops_closing_duplicate() {
        let path = DrawPath::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 0.0),
        ]);
        let polygons = path.flatten(0.1);
        assert_eq!(polygons[0].len(), 3);
    }

    #[test]
    fn test_flatten_curve_respects_tolerance() {
        let mut builder = DrawPath::builder();
        builder
            .move_to(0.0, 0.0)
            .quad_to(10.0, 20.0, 20.0, 0.0)
            .close();
        let path = builder.build();

        let coarse = path.flatten(1.0);
        let fine = path.flatten(0.01);
        assert!(fine[0].len() > coarse[0].len());
    }

    #[test]
    fn test_degenerate_subpath_is_dropped() {
        let mut builder = DrawPath::builder();
        builder.move_to(0.0, 0.0).line_to(5.0, 5.0);
        builder.move_to(0.0, 0.0).line_to(4.0, 0.0).line_to(0.0, 4.0);
        let path = builder.build();

        assert_eq!(path.subpath_count(), 2);
        assert_eq!(path.flatten(0.1).len(), 1);
    }

    #[test]
    fn test_empty_path() {
        let path = PathBuilder::new().build();
        assert!(path.is_empty());
        assert!(path.bounding_box(0.1).is_none());
    }
}
