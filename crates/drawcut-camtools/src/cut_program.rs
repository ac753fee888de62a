//! Cut program generator.
//!
//! Turns an outline, an optional hole contour and optional initials into a
//! [`MotionProgram`]. Every contour is cut in depth passes; each pass
//! retracts, moves over the contour start, plunges once and follows the
//! contour back to where it started. Initials are engraved along the
//! stroked boundary of each glyph, so the tool runs clear of the letterform.

use std::sync::Arc;

use drawcut_core::{pass_depths, GeometryError, MachiningParameters, MotionCommand, MotionProgram};
use drawcut_designer::geometry::{bounds, Contour, Point};
use drawcut_designer::{
    group_glyph_contours, DrawPath, GlyphSource, Outline, Outliner, OutlinerConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CamToolError, CamToolResult};

/// Settings of the cut program generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CutProgramConfig {
    /// Moves shorter than this (mm) are merged into the next one.
    pub flattening_tolerance: f64,
    /// Nominal text height of the initials, in mm.
    pub initials_height: f64,
    /// Engraving depth of the initials, in mm.
    pub initials_depth: f64,
    /// Largest share of the outline's width and height the initials may take.
    pub initials_fill: f64,
    /// Seconds to wait after starting the spindle.
    pub spin_up_dwell: f64,
}

impl Default for CutProgramConfig {
    fn default() -> Self {
        Self {
            flattening_tolerance: 0.05,
            initials_height: 12.0,
            initials_depth: 1.0,
            initials_fill: 0.5,
            spin_up_dwell: 2.0,
        }
    }
}

pub struct CutProgramGenerator {
    config: CutProgramConfig,
    glyphs: Option<Arc<dyn GlyphSource>>,
}

impl CutProgramGenerator {
    pub fn new(config: CutProgramConfig) -> Self {
        Self {
            config,
            glyphs: None,
        }
    }

    /// Use `source` to outline initials.
    pub fn with_glyph_source(mut self, source: Arc<dyn GlyphSource>) -> Self {
        self.glyphs = Some(source);
        self
    }

    pub fn config(&self) -> &CutProgramConfig {
        &self.config
    }

    /// Build the program for one cut.
    pub fn generate(
        &self,
        outline: &Outline,
        hole: Option<&Contour>,
        initials: Option<&str>,
        params: &MachiningParameters,
    ) -> CamToolResult<MotionProgram> {
        params.validate().map_err(CamToolError::InvalidParameters)?;
        self.validate_config()?;
        if outline.contours().iter().all(|c| c.len() < 3) {
            return Err(GeometryError::DegenerateOutline.into());
        }

        let mut program = MotionProgram::new();
        self.push_preamble(&mut program, params);

        let initials = initials.map(str::trim).filter(|text| !text.is_empty());
        if let Some(text) = initials {
            match &self.glyphs {
                Some(source) => {
                    let glyph_contours =
                        self.engrave_initials(source.as_ref(), text, outline, params)?;
                    program.push(MotionCommand::Comment(format!("Initials {}", text)));
                    for depth in pass_depths(self.config.initials_depth, params.depth_of_cut) {
                        for contour in &glyph_contours {
                            self.push_trace(&mut program, contour, depth, params);
                        }
                    }
                }
                None => debug!("No glyph source; skipping initials '{}'", text),
            }
        }

        let depths = params.pass_depths();
        for (pass, depth) in depths.iter().enumerate() {
            program.push(MotionCommand::Comment(format!(
                "Pass {} of {} at Z{:.3}",
                pass + 1,
                depths.len(),
                depth
            )));
            if let Some(hole) = hole.filter(|h| h.len() >= 3) {
                self.push_trace(&mut program, hole, *depth, params);
            }
            for contour in outline.contours().iter().filter(|c| c.len() >= 3) {
                self.push_trace(&mut program, contour, *depth, params);
            }
        }

        program.push(MotionCommand::rapid_z(params.safe_z));
        program.push(MotionCommand::SpindleStop);
        program.push(MotionCommand::rapid_xy(0.0, 0.0));

        info!(
            "Generated cut program: {} passes, {} lines",
            depths.len(),
            program.len()
        );
        Ok(program)
    }

    fn validate_config(&self) -> CamToolResult<()> {
        let c = &self.config;
        for (name, value) in [
            ("flattening_tolerance", c.flattening_tolerance),
            ("initials_height", c.initials_height),
            ("initials_depth", c.initials_depth),
            ("initials_fill", c.initials_fill),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CamToolError::InvalidParameters(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !c.spin_up_dwell.is_finite() || c.spin_up_dwell < 0.0 {
            return Err(CamToolError::InvalidParameters(format!(
                "spin_up_dwell must not be negative, got {}",
                c.spin_up_dwell
            )));
        }
        Ok(())
    }

    fn push_preamble(&self, program: &mut MotionProgram, params: &MachiningParameters) {
        program.push(MotionCommand::Comment("DrawCut cut program".to_string()));
        program.push(MotionCommand::Comment(format!(
            "Tool {:.3} mm, {} passes to {:.3} mm",
            params.tool_diameter,
            params.pass_count(),
            params.target_depth
        )));
        program.push(MotionCommand::Metric);
        program.push(MotionCommand::Absolute);
        program.push(MotionCommand::XyPlane);
        program.push(MotionCommand::rapid_z(params.safe_z));
        program.push(MotionCommand::SpindleOn(params.spindle_rpm));
        program.push(MotionCommand::Dwell(self.config.spin_up_dwell));
    }

    /// One closed trace of `contour` at `depth`.
    fn push_trace(
        &self,
        program: &mut MotionProgram,
        contour: &Contour,
        depth: f64,
        params: &MachiningParameters,
    ) {
        let points = contour.points();
        let Some(start) = points.first() else {
            return;
        };

        program.push(MotionCommand::rapid_z(params.safe_z));
        program.push(MotionCommand::rapid_xy(start.x, start.y));
        program.push(MotionCommand::Plunge {
            z: depth,
            feed: params.plunge_feed_rate,
        });

        let mut last = *start;
        for p in points.iter().skip(1) {
            if p.distance_to(&last) < self.config.flattening_tolerance {
                continue;
            }
            program.push(MotionCommand::Linear {
                x: p.x,
                y: p.y,
                feed: params.feed_rate,
            });
            last = *p;
        }
        program.push(MotionCommand::Linear {
            x: start.x,
            y: start.y,
            feed: params.feed_rate,
        });
    }

    /// Tool paths for the initials: each laid-out glyph stroked with the
    /// tool diameter.
    fn engrave_initials(
        &self,
        source: &dyn GlyphSource,
        text: &str,
        outline: &Outline,
        params: &MachiningParameters,
    ) -> CamToolResult<Vec<Contour>> {
        let outliner = Outliner::new(OutlinerConfig::from_params(
            params,
            self.config.flattening_tolerance,
        ))?;

        let mut paths = Vec::new();
        for glyph in self.layout_initials(source, text, outline)? {
            let mut builder = DrawPath::builder();
            for contour in &glyph {
                let mut points = contour.points().iter();
                if let Some(first) = points.next() {
                    builder.move_to(first.x, first.y);
                    for p in points {
                        builder.line_to(p.x, p.y);
                    }
                    builder.close();
                }
            }
            let stroked = outliner.stroke(&builder.build(), params.tool_diameter)?;
            paths.extend(stroked.contours().iter().cloned());
        }
        debug!("Initials '{}' engrave {} contours", text, paths.len());
        Ok(paths)
    }

    /// Glyph contours scaled and centred inside the outline's bounding box,
    /// one list per glyph with its counters after the exterior.
    fn layout_initials(
        &self,
        source: &dyn GlyphSource,
        text: &str,
        outline: &Outline,
    ) -> CamToolResult<Vec<Vec<Contour>>> {
        let raw = source.outline_text(text, self.config.initials_height)?;
        let glyphs: Vec<Vec<Contour>> = group_glyph_contours(raw)
            .iter()
            .map(|glyph| glyph.contours().cloned().collect())
            .collect();

        let (tx0, ty0, tx1, ty1) = bounds(glyphs.iter().flatten().flat_map(|c| c.points()))
            .ok_or_else(|| CamToolError::Initials(format!("no glyphs for '{}'", text)))?;
        let (ox0, oy0, ox1, oy1) = outline
            .bounding_box()
            .ok_or(GeometryError::DegenerateOutline)?;

        let (text_w, text_h) = (tx1 - tx0, ty1 - ty0);
        let fill = self.config.initials_fill;
        let mut scale = 1.0f64;
        if text_w > 0.0 {
            scale = scale.min(fill * (ox1 - ox0) / text_w);
        }
        if text_h > 0.0 {
            scale = scale.min(fill * (oy1 - oy0) / text_h);
        }

        let text_centre = Point::new((tx0 + tx1) / 2.0, (ty0 + ty1) / 2.0);
        let target = Point::new((ox0 + ox1) / 2.0, (oy0 + oy1) / 2.0);
        debug!("Initials '{}' scaled by {:.3}", text, scale);

        let place = |p: Point| {
            Point::new(
                target.x + (p.x - text_centre.x) * scale,
                target.y + (p.y - text_centre.y) * scale,
            )
        };
        Ok(glyphs
            .iter()
            .map(|glyph| glyph.iter().map(|c| c.map_points(place)).collect())
            .collect())
    }
}
