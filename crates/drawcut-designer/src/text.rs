//! Glyph outlines for engraved initials.

use drawcut_core::GeometryError;
use rusttype::{point, Font, Scale};

use crate::font_manager;
use crate::geometry::{Contour, Point};
use crate::path::PathBuilder;

/// Contours smaller than this (mm²) are font artefacts.
const MIN_GLYPH_AREA: f64 = 0.001;

/// Supplies glyph contours for a string.
pub trait GlyphSource: Send + Sync {
    /// Contours of `text` set with an em size of `height` mm, baseline on
    /// y = 0 and Y pointing up.
    fn outline_text(&self, text: &str, height: f64) -> Result<Vec<Contour>, GeometryError>;
}

/// One glyph: an exterior contour and the counters cut out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub exterior: Contour,
    pub holes: Vec<Contour>,
}

impl Glyph {
    /// Exterior first, then holes.
    pub fn contours(&self) -> impl Iterator<Item = &Contour> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }
}

/// Group raw glyph contours into exteriors and holes.
///
/// A contour is a hole when its start point lies inside an odd number of
/// the other contours. Each hole belongs to the smallest exterior that
/// contains its start point. Tiny contours are discarded.
pub fn group_glyph_contours(contours: Vec<Contour>) -> Vec<Glyph> {
    let contours: Vec<Contour> = contours
        .into_iter()
        .filter(|c| c.len() >= 3 && c.signed_area().abs() > MIN_GLYPH_AREA)
        .collect();

    let depth: Vec<usize> = contours
        .iter()
        .enumerate()
        .map(|(i, c)| match c.start() {
            Some(start) => contours
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && other.contains(&start))
                .count(),
            None => 0,
        })
        .collect();

    let mut glyphs: Vec<(usize, Glyph)> = contours
        .iter()
        .enumerate()
        .filter(|(i, _)| depth[*i] % 2 == 0)
        .map(|(i, c)| {
            (
                i,
                Glyph {
                    exterior: c.clone(),
                    holes: Vec::new(),
                },
            )
        })
        .collect();

    for (i, hole) in contours.iter().enumerate().filter(|(i, _)| depth[*i] % 2 == 1) {
        let Some(start) = hole.start() else { continue };
        let owner = glyphs
            .iter_mut()
            .filter(|(j, glyph)| depth[*j] + 1 == depth[i] && glyph.exterior.contains(&start))
            .min_by(|(_, a), (_, b)| {
                a.exterior
                    .signed_area()
                    .abs()
                    .total_cmp(&b.exterior.signed_area().abs())
            });
        match owner {
            Some((_, glyph)) => glyph.holes.push(hole.clone()),
            None => tracing::debug!("Dropping glyph hole without an enclosing contour"),
        }
    }

    glyphs.into_iter().map(|(_, glyph)| glyph).collect()
}

/// Glyph source backed by a TrueType font.
pub struct FontGlyphSource {
    font: Font<'static>,
    tolerance: f64,
}

impl FontGlyphSource {
    pub fn new(font: Font<'static>, tolerance: f64) -> Self {
        Self { font, tolerance }
    }

    /// Look the family up among the installed system fonts.
    pub fn from_system(family: &str, bold: bool, tolerance: f64) -> Result<Self, GeometryError> {
        let font = font_manager::load_font(family, bold)
            .ok_or_else(|| GeometryError::Glyph(format!("font '{}' not available", family)))?;
        Ok(Self::new(font, tolerance))
    }

    pub fn from_bytes(bytes: Vec<u8>, tolerance: f64) -> Result<Self, GeometryError> {
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| GeometryError::Glyph("invalid font data".to_string()))?;
        Ok(Self::new(font, tolerance))
    }
}

impl GlyphSource for FontGlyphSource {
    fn outline_text(&self, text: &str, height: f64) -> Result<Vec<Contour>, GeometryError> {
        if !height.is_finite() || height <= 0.0 {
            return Err(GeometryError::Glyph(format!("invalid text height {}", height)));
        }

        // One font unit per millimetre; rusttype lays out with Y down.
        let mut builder = PathBuilder::new();
        for glyph in self
            .font
            .layout(text, Scale::uniform(height as f32), point(0.0, 0.0))
        {
            glyph.build_outline(&mut builder);
        }
        let path = builder.build();

        Ok(path
            .flatten(self.tolerance)
            .into_iter()
            .map(|ring| Contour::new(ring.into_iter().map(|p| Point::new(p.x, -p.y)).collect()))
            .collect())
    }
}
