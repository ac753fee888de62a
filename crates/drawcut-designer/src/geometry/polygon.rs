//! Polygon predicates and the self-intersection splitter.

use super::Point;
use crate::path::dedup_closed;

/// Rings smaller than this are treated as slivers and discarded.
const MIN_LOOP_AREA: f64 = 1e-9;

/// Shoelace area; positive for counter-clockwise rings.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice / 2.0
}

/// Even-odd ray casting test.
pub fn point_in_polygon(p: &Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Shortest distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: &Point, a: &Point, b: &Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&Point::new(a.x + t * dx, a.y + t * dy))
}

fn cross(o: &Point, a: &Point, b: &Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Crossing point of segments `p1`-`p2` and `q1`-`q2`.
///
/// Only proper crossings count: touching at an endpoint and collinear
/// overlap return `None`.
pub fn segment_intersection(p1: &Point, p2: &Point, q1: &Point, q2: &Point) -> Option<Point> {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if (d1 > 0.0) == (d2 > 0.0) || d1 == 0.0 || d2 == 0.0 {
        return None;
    }
    if (d3 > 0.0) == (d4 > 0.0) || d3 == 0.0 || d4 == 0.0 {
        return None;
    }

    let t = d1 / (d1 - d2);
    Some(Point::new(
        p1.x + t * (p2.x - p1.x),
        p1.y + t * (p2.y - p1.y),
    ))
}

/// First pair of non-adjacent edges of the ring that cross.
fn first_crossing(ring: &[Point]) -> Option<(usize, usize, Point)> {
    let n = ring.len();
    if n < 4 {
        return None;
    }
    for i in 0..n {
        let a1 = ring[i];
        let a2 = ring[(i + 1) % n];
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let b1 = ring[j];
            let b2 = ring[(j + 1) % n];
            if let Some(p) = segment_intersection(&a1, &a2, &b1, &b2) {
                return Some((i, j, p));
            }
        }
    }
    None
}

/// Split a closed ring into simple rings at every self-crossing.
///
/// The union of the returned rings covers the same edges as the input.
/// A ring without crossings is returned unchanged (minus duplicates).
/// Slivers are dropped.
pub fn split_simple_loops(ring: &[Point]) -> Vec<Vec<Point>> {
    let mut pending = vec![dedup_closed(ring.to_vec())];
    let mut simple = Vec::new();

    while let Some(current) = pending.pop() {
        if current.len() < 3 {
            continue;
        }
        match first_crossing(&current) {
            None => {
                if signed_area(&current).abs() >= MIN_LOOP_AREA {
                    simple.push(current);
                }
            }
            Some((i, j, p)) => {
                // Loop from the crossing through edges i+1..=j back to the crossing.
                let mut inner = Vec::with_capacity(j - i + 1);
                inner.push(p);
                inner.extend_from_slice(&current[i + 1..=j]);

                let mut outer = Vec::with_capacity(current.len() - (j - i) + 1);
                outer.extend_from_slice(&current[..=i]);
                outer.push(p);
                outer.extend_from_slice(&current[j + 1..]);

                pending.push(dedup_closed(inner));
                pending.push(dedup_closed(outer));
            }
        }
    }

    simple
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_signed_area_orientation() {
        let ccw = pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        assert_eq!(signed_area(&ccw), 4.0);
        let mut cw = ccw.clone();
        cw.reverse();
        assert_eq!(signed_area(&cw), -4.0);
    }

    #[test]
    fn test_point_in_polygon_concave() {
        let l_shape = pts(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 2.0),
            (2.0, 2.0),
            (2.0, 10.0),
            (0.0, 10.0),
        ]);
        assert!(point_in_polygon(&Point::new(1.0, 5.0), &l_shape));
        assert!(point_in_polygon(&Point::new(5.0, 1.0), &l_shape));
        assert!(!point_in_polygon(&Point::new(5.0, 5.0), &l_shape));
    }

    #[test]
    fn test_segment_intersection_proper_only() {
        let hit = segment_intersection(
            &Point::new(0.0, 0.0),
            &Point::new(4.0, 4.0),
            &Point::new(0.0, 4.0),
            &Point::new(4.0, 0.0),
        );
        assert_eq!(hit, Some(Point::new(2.0, 2.0)));

        // Shared endpoint is not a crossing.
        let touch = segment_intersection(
            &Point::new(0.0, 0.0),
            &Point::new(4.0, 0.0),
            &Point::new(4.0, 0.0),
            &Point::new(4.0, 4.0),
        );
        assert_eq!(touch, None);
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(distance_to_segment(&Point::new(5.0, 3.0), &a, &b), 3.0);
        assert_eq!(distance_to_segment(&Point::new(13.0, 4.0), &a, &b), 5.0);
    }

    #[test]
    fn test_simple_ring_is_kept() {
        let square = pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let loops = split_simple_loops(&square);
        assert_eq!(loops, vec![square]);
    }

    #[test]
    fn test_bowtie_splits_into_two_triangles() {
        let bowtie = pts(&[(0.0, 0.0), (4.0, 4.0), (4.0, 0.0), (0.0, 4.0)]);
        let loops = split_simple_loops(&bowtie);

        assert_eq!(loops.len(), 2);
        let total: f64 = loops.iter().map(|l| signed_area(l).abs()).sum();
        assert!((total - 8.0).abs() < 1e-9);
        for l in &loops {
            assert_eq!(l.len(), 3);
            assert!(l.contains(&Point::new(2.0, 2.0)));
        }
    }

    #[test]
    fn test_figure_eight_with_zero_net_area_is_split() {
        let eight = pts(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]);
        assert_eq!(signed_area(&eight), 0.0);
        assert_eq!(split_simple_loops(&eight).len(), 2);
    }

    #[test]
    fn test_double_crossing_splits_recursively() {
        // Two zigzags crossing three times enclose four lobes.
        let ribbon = pts(&[
            (0.0, 0.0),
            (2.0, 2.0),
            (4.0, 0.0),
            (6.0, 2.0),
            (6.0, 0.0),
            (4.0, 2.0),
            (2.0, 0.0),
            (0.0, 2.0),
        ]);
        let loops = split_simple_loops(&ribbon);
        assert_eq!(loops.len(), 4);
        let total: f64 = loops.iter().map(|l| signed_area(l).abs()).sum();
        assert!((total - 6.0).abs() < 1e-9);
        for l in &loops {
            assert!(first_crossing(l).is_none());
        }
    }
}
