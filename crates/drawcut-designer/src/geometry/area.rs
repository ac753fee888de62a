//! Areas: regions bounded by closed loops that may contain circular arcs.
//!
//! Every loop is stored counter-clockwise; membership in `outer` or `holes`
//! carries the sign. A point is inside the area when the number of outer
//! loops around it exceeds the number of hole loops around it.

use std::f64::consts::{FRAC_PI_2, PI};
use std::panic;

use cavalier_contours::polyline::{
    BooleanOp, PlineOrientation, PlineSource, PlineSourceMut, PlineVertex, Polyline,
};
use drawcut_core::GeometryError;
use tracing::debug;

use super::polygon::{point_in_polygon, signed_area, split_simple_loops};
use super::{Contour, Point};
use crate::path::DrawPath;

/// Chord tolerance used when a path centerline is flattened for buffering.
pub const CENTERLINE_TOLERANCE: f64 = 0.01;

const REPEAT_EPSILON: f64 = 1e-5;
const BULGE_EPSILON: f64 = 1e-9;
const MIN_TOLERANCE: f64 = 1e-4;

/// A planar region with arc-bearing boundary loops.
#[derive(Debug, Clone, Default)]
pub struct Area {
    outer: Vec<Polyline<f64>>,
    holes: Vec<Polyline<f64>>,
}

impl Area {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.outer.is_empty()
    }

    pub fn outer_count(&self) -> usize {
        self.outer.len()
    }

    pub fn hole_count(&self) -> usize {
        self.holes.len()
    }

    /// Number of boundary loops, outer and hole.
    pub fn loop_count(&self) -> usize {
        self.outer.len() + self.holes.len()
    }

    pub fn contains(&self, p: &Point) -> bool {
        let around = |loops: &[Polyline<f64>]| {
            loops
                .iter()
                .filter(|pl| point_in_polygon(p, &flatten_polyline(pl, CENTERLINE_TOLERANCE)))
                .count() as i64
        };
        around(&self.outer) - around(&self.holes) > 0
    }
}

fn guarded<T>(what: &str, op: impl FnOnce() -> T) -> Result<T, GeometryError> {
    panic::catch_unwind(panic::AssertUnwindSafe(op)).map_err(|_| {
        tracing::warn!("Panic during {}", what);
        GeometryError::OffsetFailed(what.to_string())
    })
}

fn clean_polyline(mut pline: Polyline<f64>) -> Polyline<f64> {
    pline.remove_repeat_pos(REPEAT_EPSILON);
    if pline.is_closed() && pline.vertex_count() > 1 {
        if let (Some(first), Some(last)) = (pline.get(0), pline.get(pline.vertex_count() - 1)) {
            if (first.x - last.x).abs() < REPEAT_EPSILON && (first.y - last.y).abs() < REPEAT_EPSILON
            {
                pline.remove(pline.vertex_count() - 1);
            }
        }
    }
    pline
}

/// The same loop traversed the other way; bulges change sign and shift
/// one vertex back.
fn reversed(pline: &Polyline<f64>) -> Polyline<f64> {
    let n = pline.vertex_count();
    let mut out = Polyline::new();
    for j in 0..n {
        let v = pline.at(n - 1 - j);
        let bulge = pline.at((2 * n - 2 - j) % n).bulge;
        out.add_vertex(PlineVertex::new(v.x, v.y, -bulge));
    }
    out.set_is_closed(true);
    out
}

fn counter_clockwise(pline: Polyline<f64>) -> Polyline<f64> {
    match pline.orientation() {
        PlineOrientation::Clockwise => reversed(&pline),
        _ => pline,
    }
}

fn polyline_from_ring(ring: &[Point]) -> Polyline<f64> {
    let mut points = ring.to_vec();
    if signed_area(ring) < 0.0 {
        points.reverse();
    }
    let mut pline = Polyline::new();
    for p in points {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.set_is_closed(true);
    clean_polyline(pline)
}

fn offset_loop(pline: &Polyline<f64>, offset: f64) -> Result<Vec<Polyline<f64>>, GeometryError> {
    let offsets = guarded("parallel offset", || pline.parallel_offset(offset))?;
    Ok(offsets
        .into_iter()
        .map(clean_polyline)
        .filter(|pl| pl.vertex_count() >= 2)
        .collect())
}

/// Buffer of one simple ring: the outward offset bounds it, the inward
/// offset loops are its holes.
fn buffer_ring(ring: &[Point], radius: f64) -> Result<Area, GeometryError> {
    let pline = polyline_from_ring(ring);
    if pline.vertex_count() < 3 {
        return Ok(Area::empty());
    }

    let mut area = Area::empty();
    for off in offset_loop(&pline, -radius)? {
        match off.orientation() {
            PlineOrientation::CounterClockwise => area.outer.push(off),
            PlineOrientation::Clockwise => area.holes.push(reversed(&off)),
            PlineOrientation::Open => {}
        }
    }
    for off in offset_loop(&pline, radius)? {
        match off.orientation() {
            PlineOrientation::CounterClockwise => area.holes.push(off),
            other => debug!("Discarding inward offset loop with orientation {:?}", other),
        }
    }
    Ok(area)
}

/// Euclidean buffer of every subpath of `path` by `width / 2`.
///
/// Convex corners are rounded with true arcs. Self-intersecting subpaths
/// are split into simple loops whose buffers are united.
pub fn buffer_path(path: &DrawPath, width: f64) -> Result<Area, GeometryError> {
    if !width.is_finite() || width <= 0.0 {
        return Err(GeometryError::InvalidWidth(width));
    }
    let rings = path.flatten(CENTERLINE_TOLERANCE);
    if rings.is_empty() {
        return Err(GeometryError::EmptyPath);
    }

    let radius = width / 2.0;
    let mut area = Area::empty();
    for ring in &rings {
        let loops = split_simple_loops(ring);
        if loops.len() > 1 {
            debug!("Subpath self-intersects; split into {} loops", loops.len());
        }
        for simple in loops {
            let piece = buffer_ring(&simple, radius)?;
            area = union_areas(&area, &piece)?;
        }
    }

    if area.is_empty() {
        return Err(GeometryError::EmptyPath);
    }
    debug!(
        "Buffered path by {:.3}: {} outer, {} hole loops",
        radius,
        area.outer.len(),
        area.holes.len()
    );
    Ok(area)
}

/// The region enclosed by the path.
pub fn fill_area(path: &DrawPath) -> Result<Area, GeometryError> {
    let loops: Vec<Polyline<f64>> = path
        .flatten(CENTERLINE_TOLERANCE)
        .iter()
        .flat_map(|ring| split_simple_loops(ring))
        .map(|ring| polyline_from_ring(&ring))
        .filter(|pl| pl.vertex_count() >= 3)
        .collect();
    if loops.is_empty() {
        return Err(GeometryError::EmptyPath);
    }
    union_loops(loops)
}

/// Union of two areas, hole bookkeeping included.
pub fn union_areas(a: &Area, b: &Area) -> Result<Area, GeometryError> {
    if a.is_empty() {
        return Ok(b.clone());
    }
    if b.is_empty() {
        return Ok(a.clone());
    }

    let mut outer = a.outer.clone();
    outer.extend(b.outer.iter().cloned());
    let mut result = union_loops(outer)?;

    // A hole survives where the other area does not cover it, or where both
    // areas have a hole.
    let (holes_a, islands_a) = subtract_loops(a.holes.clone(), &b.outer)?;
    let (holes_b, islands_b) = subtract_loops(b.holes.clone(), &a.outer)?;
    let (holes_ab, islands_ab) = intersect_loops(&a.holes, &b.holes)?;

    result.holes.extend(holes_a);
    result.holes.extend(holes_b);
    result.holes.extend(holes_ab);
    result.outer.extend(islands_a);
    result.outer.extend(islands_b);
    result.outer.extend(islands_ab);
    Ok(result)
}

fn union_loops(loops: Vec<Polyline<f64>>) -> Result<Area, GeometryError> {
    let mut merged: Vec<Polyline<f64>> = Vec::new();
    let mut gaps: Vec<Polyline<f64>> = Vec::new();

    for candidate in &loops {
        let mut current = candidate.clone();
        let mut kept = Vec::with_capacity(merged.len() + 1);
        for existing in merged.drain(..) {
            let result = guarded("union", || current.boolean(&existing, BooleanOp::Or))?;
            let mut pos = result.pos_plines;
            if pos.len() == 1 {
                if let Some(joined) = pos.pop() {
                    current = counter_clockwise(joined.pline);
                    gaps.extend(
                        result
                            .neg_plines
                            .into_iter()
                            .map(|p| counter_clockwise(p.pline)),
                    );
                    continue;
                }
            }
            kept.push(existing);
        }
        kept.push(current);
        merged = kept;
    }

    let (holes, islands) = subtract_loops(gaps, &loops)?;
    merged.extend(islands);
    Ok(Area {
        outer: merged,
        holes,
    })
}

/// Remove every cutter from every piece. Cutters lying strictly inside a
/// piece are returned as islands.
fn subtract_loops(
    pieces: Vec<Polyline<f64>>,
    cutters: &[Polyline<f64>],
) -> Result<(Vec<Polyline<f64>>, Vec<Polyline<f64>>), GeometryError> {
    let mut remaining = pieces;
    let mut islands = Vec::new();
    for cutter in cutters {
        let mut next = Vec::with_capacity(remaining.len());
        for piece in &remaining {
            let result = guarded("difference", || piece.boolean(cutter, BooleanOp::Not))?;
            next.extend(result.pos_plines.into_iter().map(|p| counter_clockwise(p.pline)));
            islands.extend(result.neg_plines.into_iter().map(|p| counter_clockwise(p.pline)));
        }
        remaining = next;
    }
    Ok((remaining, islands))
}

fn intersect_loops(
    a: &[Polyline<f64>],
    b: &[Polyline<f64>],
) -> Result<(Vec<Polyline<f64>>, Vec<Polyline<f64>>), GeometryError> {
    let mut overlap = Vec::new();
    let mut islands = Vec::new();
    for pa in a {
        for pb in b {
            let result = guarded("intersection", || pa.boolean(pb, BooleanOp::And))?;
            overlap.extend(result.pos_plines.into_iter().map(|p| counter_clockwise(p.pline)));
            islands.extend(result.neg_plines.into_iter().map(|p| counter_clockwise(p.pline)));
        }
    }
    Ok((overlap, islands))
}

/// Number of chords needed so an arc of `sweep` radians and radius
/// `radius` deviates at most `tolerance` from its chords.
fn arc_segments(radius: f64, sweep: f64, tolerance: f64) -> usize {
    let max_step = if tolerance < radius {
        (2.0 * (1.0 - tolerance / radius).acos()).min(FRAC_PI_2)
    } else {
        FRAC_PI_2
    };
    ((sweep.abs() / max_step).ceil() as usize).max(1)
}

/// Vertices of a closed polyline with every arc replaced by chords.
fn flatten_polyline(pline: &Polyline<f64>, tolerance: f64) -> Vec<Point> {
    let count = pline.vertex_count();
    let mut points = Vec::with_capacity(count);

    for i in 0..count {
        let v1 = pline.at(i);
        let v2 = pline.at((i + 1) % count);
        points.push(Point::new(v1.x, v1.y));

        if v1.bulge.abs() <= BULGE_EPSILON {
            continue;
        }
        let theta = 4.0 * v1.bulge.atan();
        let dx = v2.x - v1.x;
        let dy = v2.y - v1.y;
        let chord_len = dx.hypot(dy);
        if chord_len <= REPEAT_EPSILON {
            continue;
        }

        let radius = (chord_len / (2.0 * (theta / 2.0).sin())).abs();
        let dist_to_center = radius * (theta.abs() / 2.0).cos();
        let sign = if v1.bulge > 0.0 { 1.0 } else { -1.0 };
        let cx = (v1.x + v2.x) / 2.0 - dy / chord_len * dist_to_center * sign;
        let cy = (v1.y + v2.y) / 2.0 + dx / chord_len * dist_to_center * sign;

        let start_angle = (v1.y - cy).atan2(v1.x - cx);
        let mut end_angle = (v2.y - cy).atan2(v2.x - cx);
        if v1.bulge > 0.0 {
            if end_angle <= start_angle {
                end_angle += 2.0 * PI;
            }
        } else if end_angle >= start_angle {
            end_angle -= 2.0 * PI;
        }

        let segments = arc_segments(radius, end_angle - start_angle, tolerance);
        for j in 1..segments {
            let angle = start_angle + (end_angle - start_angle) * (j as f64 / segments as f64);
            points.push(Point::new(cx + radius * angle.cos(), cy + radius * angle.sin()));
        }
    }

    points
}

/// Flatten every loop of `area` into a contour.
///
/// Outer loops come first and run counter-clockwise; hole loops follow
/// and run clockwise. Arc chords deviate at most `tolerance`.
pub fn boundary_of(area: &Area, tolerance: f64) -> Vec<Contour> {
    let tolerance = if tolerance.is_finite() {
        tolerance.max(MIN_TOLERANCE)
    } else {
        MIN_TOLERANCE
    };
    let outer = area
        .outer
        .iter()
        .map(|pl| Contour::new(flatten_polyline(pl, tolerance)));
    let holes = area
        .holes
        .iter()
        .map(|pl| Contour::new(flatten_polyline(pl, tolerance)).reversed());
    outer.chain(holes).filter(|c| c.len() >= 3).collect()
}
