//! Toolpath outliner.
//!
//! Turns a drawn path into the contours the tool centre follows. A line
//! engraving widens the stroke by the motif width and keeps the tool radius
//! clear of it on both sides, which must yield exactly an outer and an
//! inner contour. A filled cut clears the whole interior and only needs
//! the outer boundary grown by the tool radius.

use drawcut_core::{GeometryError, MachiningParameters};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{
    boundary_of, buffer_path, fill_area, split_simple_loops, union_areas, Contour, Point,
    CENTERLINE_TOLERANCE,
};
use crate::path::DrawPath;

/// Closed contours produced from a path; outer contours run
/// counter-clockwise, inner ones clockwise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outline {
    contours: Vec<Contour>,
}

impl Outline {
    pub fn new(contours: Vec<Contour>) -> Self {
        Self { contours }
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// Even-odd containment over all contours.
    pub fn contains(&self, p: &Point) -> bool {
        self.contours.iter().filter(|c| c.contains(p)).count() % 2 == 1
    }

    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        crate::geometry::bounds(self.contours.iter().flat_map(|c| c.points()))
    }
}

/// Outliner settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlinerConfig {
    pub tool_diameter: f64,
    pub motif_width: f64,
    /// Maximum chord deviation of flattened arcs, in mm.
    pub flattening_tolerance: f64,
}

impl OutlinerConfig {
    pub fn from_params(params: &MachiningParameters, flattening_tolerance: f64) -> Self {
        Self {
            tool_diameter: params.tool_diameter,
            motif_width: params.motif_width,
            flattening_tolerance,
        }
    }
}

/// Generates tool outlines from drawn paths.
#[derive(Debug, Clone)]
pub struct Outliner {
    config: OutlinerConfig,
}

impl Outliner {
    pub fn new(config: OutlinerConfig) -> Result<Self, GeometryError> {
        let tol = config.flattening_tolerance;
        if !tol.is_finite() || tol <= 0.0 {
            return Err(GeometryError::InvalidTolerance(tol));
        }
        for width in [config.tool_diameter, config.motif_width] {
            if !width.is_finite() || width <= 0.0 {
                return Err(GeometryError::InvalidWidth(width));
            }
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &OutlinerConfig {
        &self.config
    }

    /// Outline for engraving the drawn line.
    ///
    /// Fails with [`GeometryError::IntersectingOrNoInterior`] unless the
    /// buffered stroke has exactly an outer and an inner contour: a
    /// self-intersecting path, a path whose interior is narrower than the
    /// stroke, or several separate subpaths are all rejected.
    pub fn generate_outline(&self, path: &DrawPath) -> Result<Outline, GeometryError> {
        let rings = path.flatten(CENTERLINE_TOLERANCE);
        if rings.is_empty() {
            return Err(GeometryError::EmptyPath);
        }
        if let Some(loops) = rings
            .iter()
            .map(|ring| split_simple_loops(ring).len())
            .find(|&loops| loops > 1)
        {
            debug!("Path self-intersects ({} loops)", loops);
            return Err(GeometryError::IntersectingOrNoInterior { contours: loops });
        }

        let width = self.config.motif_width + self.config.tool_diameter;
        let outline = self.stroke(path, width)?;
        debug!("Line outline has {} contours", outline.len());

        if outline.len() != 2 {
            return Err(GeometryError::IntersectingOrNoInterior {
                contours: outline.len(),
            });
        }
        Ok(outline)
    }

    /// Boundary of `path` stroked with a pen `width` wide, with no check on
    /// the number of contours.
    pub fn stroke(&self, path: &DrawPath, width: f64) -> Result<Outline, GeometryError> {
        let area = buffer_path(path, width)?;
        Ok(Outline::new(boundary_of(&area, self.config.flattening_tolerance)))
    }

    /// Outline for cutting out the filled shape.
    ///
    /// The path is grown by the tool radius and united with its own
    /// interior, so self-intersecting paths are accepted. The result may
    /// have any number of contours.
    pub fn generate_filled_outline(&self, path: &DrawPath) -> Result<Outline, GeometryError> {
        let stroke = buffer_path(path, self.config.tool_diameter)?;
        let fill = fill_area(path)?;
        let area = union_areas(&stroke, &fill)?;
        let contours = boundary_of(&area, self.config.flattening_tolerance);
        debug!("Filled outline has {} contours", contours.len());

        if contours.is_empty() {
            return Err(GeometryError::DegenerateOutline);
        }
        Ok(Outline::new(contours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outliner() -> Outliner {
        Outliner::new(OutlinerConfig {
            tool_diameter: 2.0,
            motif_width: 2.0,
            flattening_tolerance: 0.05,
        })
        .unwrap()
    }

    fn rect(w: f64, h: f64) -> DrawPath {
        DrawPath::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ])
    }

    #[test]
    fn test_rejects_invalid_config() {
        let bad = OutlinerConfig {
            tool_diameter: 2.0,
            motif_width: 2.0,
            flattening_tolerance: 0.0,
        };
        assert_eq!(
            Outliner::new(bad).unwrap_err(),
            GeometryError::InvalidTolerance(0.0)
        );
    }

    #[test]
    fn test_rectangle_outline_has_two_contours() {
        let outline = outliner().generate_outline(&rect(30.0, 20.0)).unwrap();
        assert_eq!(outline.len(), 2);
        assert!(outline.contains(&Point::new(0.0, 10.0)));
        assert!(!outline.contains(&Point::new(15.0, 10.0)));
    }

    #[test]
    fn test_narrow_interior_is_rejected() {
        let err = outliner().generate_outline(&rect(30.0, 3.0)).unwrap_err();
        assert_eq!(err, GeometryError::IntersectingOrNoInterior { contours: 1 });
    }

    #[test]
    fn test_two_subpaths_are_rejected() {
        let mut builder = DrawPath::builder();
        for x in [0.0, 40.0] {
            builder
                .move_to(x, 0.0)
                .line_to(x + 20.0, 0.0)
                .line_to(x + 20.0, 20.0)
                .line_to(x, 20.0)
                .close();
        }
        let err = outliner().generate_outline(&builder.build()).unwrap_err();
        assert_eq!(err, GeometryError::IntersectingOrNoInterior { contours: 4 });
    }

    #[test]
    fn test_self_intersection_reports_its_loops() {
        let figure_eight = DrawPath::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(30.0, 30.0),
            Point::new(30.0, 0.0),
            Point::new(0.0, 30.0),
        ]);
        assert_eq!(
            outliner().generate_outline(&figure_eight).unwrap_err(),
            GeometryError::IntersectingOrNoInterior { contours: 2 }
        );
    }

    #[test]
    fn test_stroke_keeps_every_contour() {
        // Too narrow for generate_outline, but the stroke still has a boundary.
        let outline = outliner().stroke(&rect(30.0, 3.0), 4.0).unwrap();
        assert_eq!(outline.len(), 1);
        let (x0, _, x1, _) = outline.bounding_box().unwrap();
        assert!((x0 + 2.0).abs() < 1e-6);
        assert!((x1 - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_filled_outline_covers_interior() {
        let outline = outliner()
            .generate_filled_outline(&rect(30.0, 3.0))
            .unwrap();
        assert_eq!(outline.len(), 1);
        assert!(outline.contains(&Point::new(15.0, 1.5)));
        assert!(outline.contains(&Point::new(-0.9, 1.5)));
    }

    #[test]
    fn test_empty_path() {
        let path = DrawPath::builder().build();
        assert_eq!(
            outliner().generate_outline(&path).unwrap_err(),
            GeometryError::EmptyPath
        );
        assert!(outliner().generate_filled_outline(&path).is_err());
    }
}
