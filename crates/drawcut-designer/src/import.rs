//! SVG shape import.
//!
//! Gallery presets and downloaded shapes arrive as SVG documents or bare
//! path data. Both are parsed into a [`DrawPath`], flipped into machine
//! space (Y up), scaled to a nominal size and centred on the material.

use std::f64::consts::{FRAC_PI_2, TAU};

use drawcut_core::{GeometryError, MaterialDimensions};
use lyon::math::Transform;

use crate::path::{DrawPath, PathBuilder};

/// Parse SVG path data (`M L H V C S Q T A Z`, absolute and relative).
pub fn parse_path_data(data: &str) -> Result<DrawPath, GeometryError> {
    let tokens = tokenize_path_data(data);
    let mut builder = PathBuilder::new();
    let mut current = (0.0f64, 0.0f64);
    let mut start = (0.0f64, 0.0f64);
    let mut prev_cubic_ctrl: Option<(f64, f64)> = None;
    let mut prev_quad_ctrl: Option<(f64, f64)> = None;
    let mut i = 0usize;

    let number = |tokens: &[String], at: usize| -> Result<f64, GeometryError> {
        tokens
            .get(at)
            .ok_or_else(|| GeometryError::PathData("unexpected end of path data".to_string()))?
            .parse::<f64>()
            .map_err(|_| GeometryError::PathData(format!("invalid number '{}'", tokens[at])))
    };
    let has_args = |tokens: &[String], at: usize| at < tokens.len() && !is_command(&tokens[at]);

    while i < tokens.len() {
        let Some(cmd) = tokens[i].chars().next().filter(|_| is_command(&tokens[i])) else {
            return Err(GeometryError::PathData(format!(
                "expected a command, found '{}'",
                tokens[i]
            )));
        };
        let relative = cmd.is_ascii_lowercase();
        let rel = |(x, y): (f64, f64), cur: (f64, f64)| {
            if relative {
                (cur.0 + x, cur.1 + y)
            } else {
                (x, y)
            }
        };
        i += 1;

        match cmd.to_ascii_uppercase() {
            'M' => {
                let mut first = true;
                while has_args(&tokens, i) {
                    let p = rel((number(&tokens, i)?, number(&tokens, i + 1)?), current);
                    i += 2;
                    if first {
                        builder.move_to(p.0, p.1);
                        start = p;
                        first = false;
                    } else {
                        builder.line_to(p.0, p.1);
                    }
                    current = p;
                }
                prev_cubic_ctrl = None;
                prev_quad_ctrl = None;
            }
            'L' => {
                while has_args(&tokens, i) {
                    let p = rel((number(&tokens, i)?, number(&tokens, i + 1)?), current);
                    i += 2;
                    builder.line_to(p.0, p.1);
                    current = p;
                }
                prev_cubic_ctrl = None;
                prev_quad_ctrl = None;
            }
            'H' => {
                while has_args(&tokens, i) {
                    let x = number(&tokens, i)?;
                    i += 1;
                    current.0 = if relative { current.0 + x } else { x };
                    builder.line_to(current.0, current.1);
                }
                prev_cubic_ctrl = None;
                prev_quad_ctrl = None;
            }
            'V' => {
                while has_args(&tokens, i) {
                    let y = number(&tokens, i)?;
                    i += 1;
                    current.1 = if relative { current.1 + y } else { y };
                    builder.line_to(current.0, current.1);
                }
                prev_cubic_ctrl = None;
                prev_quad_ctrl = None;
            }
            'C' => {
                while has_args(&tokens, i) {
                    let c1 = rel((number(&tokens, i)?, number(&tokens, i + 1)?), current);
                    let c2 = rel((number(&tokens, i + 2)?, number(&tokens, i + 3)?), current);
                    let end = rel((number(&tokens, i + 4)?, number(&tokens, i + 5)?), current);
                    i += 6;
                    builder.cubic_to(c1.0, c1.1, c2.0, c2.1, end.0, end.1);
                    current = end;
                    prev_cubic_ctrl = Some(c2);
                }
                prev_quad_ctrl = None;
            }
            'S' => {
                while has_args(&tokens, i) {
                    let c1 = prev_cubic_ctrl
                        .map(|c| reflect(c, current))
                        .unwrap_or(current);
                    let c2 = rel((number(&tokens, i)?, number(&tokens, i + 1)?), current);
                    let end = rel((number(&tokens, i + 2)?, number(&tokens, i + 3)?), current);
                    i += 4;
                    builder.cubic_to(c1.0, c1.1, c2.0, c2.1, end.0, end.1);
                    current = end;
                    prev_cubic_ctrl = Some(c2);
                }
                prev_quad_ctrl = None;
            }
            'Q' => {
                while has_args(&tokens, i) {
                    let c = rel((number(&tokens, i)?, number(&tokens, i + 1)?), current);
                    let end = rel((number(&tokens, i + 2)?, number(&tokens, i + 3)?), current);
                    i += 4;
                    builder.quad_to(c.0, c.1, end.0, end.1);
                    current = end;
                    prev_quad_ctrl = Some(c);
                }
                prev_cubic_ctrl = None;
            }
            'T' => {
                while has_args(&tokens, i) {
                    let c = prev_quad_ctrl
                        .map(|c| reflect(c, current))
                        .unwrap_or(current);
                    let end = rel((number(&tokens, i)?, number(&tokens, i + 1)?), current);
                    i += 2;
                    builder.quad_to(c.0, c.1, end.0, end.1);
                    current = end;
                    prev_quad_ctrl = Some(c);
                }
                prev_cubic_ctrl = None;
            }
            'A' => {
                while has_args(&tokens, i) {
                    let rx = number(&tokens, i)?;
                    let ry = number(&tokens, i + 1)?;
                    let rotation = number(&tokens, i + 2)?;
                    let large_arc = number(&tokens, i + 3)? != 0.0;
                    let sweep = number(&tokens, i + 4)? != 0.0;
                    let end = rel((number(&tokens, i + 5)?, number(&tokens, i + 6)?), current);
                    i += 7;

                    let arc = SvgArc {
                        from: current,
                        to: end,
                        radii: (rx, ry),
                        rotation_deg: rotation,
                        large_arc,
                        sweep,
                    };
                    match arc.to_cubics() {
                        Some(cubics) => {
                            for (c1, c2, to) in cubics {
                                builder.cubic_to(c1.0, c1.1, c2.0, c2.1, to.0, to.1);
                            }
                        }
                        None => {
                            builder.line_to(end.0, end.1);
                        }
                    }
                    current = end;
                }
                prev_cubic_ctrl = None;
                prev_quad_ctrl = None;
            }
            'Z' => {
                builder.close();
                current = start;
                prev_cubic_ctrl = None;
                prev_quad_ctrl = None;
            }
            other => {
                return Err(GeometryError::PathData(format!(
                    "unsupported command '{}'",
                    other
                )))
            }
        }
    }

    let path = builder.build();
    if path.is_empty() {
        return Err(GeometryError::EmptyPath);
    }
    Ok(path)
}

fn is_command(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

fn reflect(p: (f64, f64), around: (f64, f64)) -> (f64, f64) {
    (2.0 * around.0 - p.0, 2.0 * around.1 - p.1)
}

/// Split path data into commands and numbers.
///
/// Commas and whitespace separate tokens; a sign starts a new number unless
/// it follows an exponent marker.
fn tokenize_path_data(data: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in data.chars() {
        match ch {
            'M' | 'm' | 'L' | 'l' | 'H' | 'h' | 'V' | 'v' | 'C' | 'c' | 'S' | 's' | 'Q' | 'q'
            | 'T' | 't' | 'A' | 'a' | 'Z' | 'z' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            }
            ' ' | ',' | '\n' | '\r' | '\t' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            '-' | '+' => {
                if !current.is_empty() && !matches!(current.chars().last(), Some('e' | 'E')) {
                    tokens.push(std::mem::take(&mut current));
                }
                current.push(ch);
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Elliptical arc in endpoint parameterisation.
struct SvgArc {
    from: (f64, f64),
    to: (f64, f64),
    radii: (f64, f64),
    rotation_deg: f64,
    large_arc: bool,
    sweep: bool,
}

type Cubic = ((f64, f64), (f64, f64), (f64, f64));

impl SvgArc {
    /// Cubic approximation, one segment per quarter turn at most.
    fn to_cubics(&self) -> Option<Vec<Cubic>> {
        let (x1, y1) = self.from;
        let (x2, y2) = self.to;
        let (mut rx, mut ry) = (self.radii.0.abs(), self.radii.1.abs());
        if rx < f64::EPSILON || ry < f64::EPSILON {
            return None;
        }

        let phi = self.rotation_deg.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();

        let dx2 = (x1 - x2) / 2.0;
        let dy2 = (y1 - y2) / 2.0;
        let x1p = cos_phi * dx2 + sin_phi * dy2;
        let y1p = -sin_phi * dx2 + cos_phi * dy2;

        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            rx *= lambda.sqrt();
            ry *= lambda.sqrt();
        }

        let denom = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
        if denom.abs() < f64::EPSILON {
            return None;
        }
        let numer = (rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p).max(0.0);
        let sign = if self.large_arc == self.sweep { -1.0 } else { 1.0 };
        let coef = sign * (numer / denom).sqrt();
        let cxp = coef * (rx * y1p / ry);
        let cyp = coef * (-ry * x1p / rx);

        let cx = cos_phi * cxp - sin_phi * cyp + (x1 + x2) / 2.0;
        let cy = sin_phi * cxp + cos_phi * cyp + (y1 + y2) / 2.0;

        let u = ((x1p - cxp) / rx, (y1p - cyp) / ry);
        let v = ((-x1p - cxp) / rx, (-y1p - cyp) / ry);
        let mut theta = u.1.atan2(u.0);
        let mut delta = (u.0 * v.1 - u.1 * v.0).atan2(u.0 * v.0 + u.1 * v.1);
        if !self.sweep && delta > 0.0 {
            delta -= TAU;
        } else if self.sweep && delta < 0.0 {
            delta += TAU;
        }

        let segments = ((delta.abs() / FRAC_PI_2).ceil() as usize).max(1);
        let step = delta / segments as f64;
        let on_ellipse = |ux: f64, uy: f64| {
            (
                cx + cos_phi * (rx * ux) - sin_phi * (ry * uy),
                cy + sin_phi * (rx * ux) + cos_phi * (ry * uy),
            )
        };

        let mut cubics = Vec::with_capacity(segments);
        for _ in 0..segments {
            let t0 = theta;
            let t1 = theta + step;
            let k = 4.0 / 3.0 * (step / 4.0).tan();
            let (s0, c0) = t0.sin_cos();
            let (s1, c1) = t1.sin_cos();
            cubics.push((
                on_ellipse(c0 - k * s0, s0 + k * c0),
                on_ellipse(c1 + k * s1, s1 - k * c1),
                on_ellipse(c1, s1),
            ));
            theta = t1;
        }
        Some(cubics)
    }
}

/// Pull the `d` attribute of every `<path>` element out of an SVG document.
pub fn extract_path_data(svg: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut search_pos = 0;
    while let Some(offset) = svg[search_pos..].find("<path") {
        let tag_start = search_pos + offset;
        let Some(tag_len) = svg[tag_start..].find('>') else {
            break;
        };
        let tag = &svg[tag_start..tag_start + tag_len];
        if let Some(d_start) = tag.find(" d=\"").map(|p| p + 4) {
            if let Some(d_len) = tag[d_start..].find('"') {
                found.push(&tag[d_start..d_start + d_len]);
            }
        }
        search_pos = tag_start + tag_len + 1;
    }
    found
}

/// Places imported shapes on the material.
#[derive(Debug, Clone)]
pub struct ShapeImporter {
    material: MaterialDimensions,
    tolerance: f64,
}

impl ShapeImporter {
    pub fn new(material: MaterialDimensions, tolerance: f64) -> Self {
        Self {
            material,
            tolerance,
        }
    }

    /// Import an SVG document or bare path data.
    ///
    /// The result is flipped to Y up, scaled so its larger side equals
    /// `size` mm and centred on the material.
    pub fn import(&self, svg: &str, size: f64) -> Result<DrawPath, GeometryError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(GeometryError::InvalidWidth(size));
        }
        let data = if svg.contains("<svg") {
            let parts = extract_path_data(svg);
            if parts.is_empty() {
                return Err(GeometryError::PathData("document has no <path> element".to_string()));
            }
            parts.join(" ")
        } else {
            svg.to_string()
        };

        let path = parse_path_data(&data)?;
        let (min_x, min_y, max_x, max_y) = path
            .bounding_box(self.tolerance)
            .ok_or(GeometryError::EmptyPath)?;
        let extent = (max_x - min_x).max(max_y - min_y);
        if extent <= 0.0 {
            return Err(GeometryError::EmptyPath);
        }

        let scale = size / extent;
        let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
        let (mx, my) = (self.material.size_x / 2.0, self.material.size_y / 2.0);
        let transform = Transform::new(
            scale as f32,
            0.0,
            0.0,
            -scale as f32,
            (mx - cx * scale) as f32,
            (my + cy * scale) as f32,
        );
        tracing::debug!("Imported shape scaled by {:.4}", scale);
        Ok(path.transformed(&transform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_splits_signs() {
        assert_eq!(
            tokenize_path_data("M10-5l2e-1,3"),
            vec!["M", "10", "-5", "l", "2e-1", "3"]
        );
    }

    #[test]
    fn test_relative_commands() {
        let path = parse_path_data("m 10 10 h 20 v 20 h -20 z").unwrap();
        let rings = path.flatten(0.1);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4);
        assert_eq!(path.bounding_box(0.1), Some((10.0, 10.0, 30.0, 30.0)));
    }

    #[test]
    fn test_arc_command_stays_on_circle() {
        let path = parse_path_data("M 0 10 A 10 10 0 1 1 0 -10 A 10 10 0 1 1 0 10 Z").unwrap();
        let rings = path.flatten(0.01);
        for p in &rings[0] {
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - 10.0).abs() < 0.05, "radius {}", r);
        }
    }

    #[test]
    fn test_bad_path_data() {
        assert!(matches!(
            parse_path_data("M 0 0 L 5"),
            Err(GeometryError::PathData(_))
        ));
        assert!(matches!(
            parse_path_data("10 10"),
            Err(GeometryError::PathData(_))
        ));
        assert_eq!(parse_path_data("").unwrap_err(), GeometryError::EmptyPath);
    }

    #[test]
    fn test_import_scales_flips_and_centres() {
        let importer = ShapeImporter::new(
            MaterialDimensions {
                size_x: 100.0,
                size_y: 60.0,
                thickness: 5.0,
            },
            0.05,
        );
        let svg = r#"<svg viewBox="0 0 10 20"><path d="M0 0 L10 0 L10 20 L0 20 Z"/></svg>"#;
        let path = importer.import(svg, 40.0).unwrap();

        let (min_x, min_y, max_x, max_y) = path.bounding_box(0.05).unwrap();
        assert!((max_y - min_y - 40.0).abs() < 1e-3);
        assert!((max_x - min_x - 20.0).abs() < 1e-3);
        assert!(((min_x + max_x) / 2.0 - 50.0).abs() < 1e-3);
        assert!(((min_y + max_y) / 2.0 - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_import_flips_y() {
        let importer = ShapeImporter::new(MaterialDimensions::default(), 0.05);
        // The top edge of the SVG (y = 0) stays on top with Y up.
        let path = importer.import("M0 0 L10 0 L5 10 Z", 10.0).unwrap();
        let ring = &path.flatten(0.05)[0];
        let (_, min_y, _, max_y) = path.bounding_box(0.05).unwrap();
        assert_eq!(ring.iter().filter(|p| (p.y - max_y).abs() < 1e-6).count(), 2);
        assert_eq!(ring.iter().filter(|p| (p.y - min_y).abs() < 1e-6).count(), 1);
    }

    #[test]
    fn test_extract_path_data() {
        let svg = r#"<svg><path id="a" d="M0 0 L1 1"/><rect/><path d="M2 2 L3 3"/></svg>"#;
        assert_eq!(extract_path_data(svg), vec!["M0 0 L1 1", "M2 2 L3 3"]);
    }
}
