//! Shape gallery: preset shapes to start from and the cuts made so far.

use std::path::Path;

use chrono::{DateTime, Local};
use drawcut_core::GeometryError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Contour;
use crate::outliner::Outline;

/// A named preset shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetShape {
    pub name: String,
    /// SVG document or bare path data.
    pub svg: String,
    /// Nominal size of the larger side, in mm.
    pub size: f64,
}

/// A finished cut, kept for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub id: Uuid,
    pub outline: Outline,
    pub hole: Option<Contour>,
    pub initials: Option<String>,
    pub created: DateTime<Local>,
}

impl Cut {
    pub fn new(outline: Outline, hole: Option<Contour>, initials: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            outline,
            hole,
            initials,
            created: Local::now(),
        }
    }

    /// Short local time of creation, e.g. `14:05`.
    pub fn time_label(&self) -> String {
        self.created.format("%H:%M").to_string()
    }
}

/// Presets plus the cuts recorded this session, newest first.
#[derive(Debug, Clone, Default)]
pub struct ShapeGallery {
    presets: Vec<PresetShape>,
    cuts: Vec<Cut>,
}

impl ShapeGallery {
    pub fn new(presets: Vec<PresetShape>) -> Self {
        Self {
            presets,
            cuts: Vec::new(),
        }
    }

    /// Parse a JSON array of presets.
    pub fn from_json(json: &str) -> Result<Self, GeometryError> {
        let presets: Vec<PresetShape> = serde_json::from_str(json)
            .map_err(|e| GeometryError::PathData(format!("invalid gallery: {}", e)))?;
        if let Some(bad) = presets.iter().find(|p| !p.size.is_finite() || p.size <= 0.0) {
            return Err(GeometryError::InvalidWidth(bad.size));
        }
        Ok(Self::new(presets))
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    pub fn presets(&self) -> &[PresetShape] {
        &self.presets
    }

    pub fn preset(&self, name: &str) -> Option<&PresetShape> {
        self.presets.iter().find(|p| p.name == name)
    }

    pub fn add_cut(&mut self, cut: Cut) {
        tracing::info!("Recorded cut {} at {}", cut.id, cut.time_label());
        self.cuts.insert(0, cut);
    }

    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    pub fn cut(&self, id: Uuid) -> Option<&Cut> {
        self.cuts.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PRESETS: &str = r#"[
        {"name": "heart", "svg": "M 0 0 L 10 0 L 5 8 Z", "size": 60.0},
        {"name": "star", "svg": "<svg><path d=\"M0 0 L1 1 L0 1 Z\"/></svg>", "size": 50.0}
    ]"#;

    #[test]
    fn test_presets_from_json() {
        let gallery = ShapeGallery::from_json(PRESETS).unwrap();
        assert_eq!(gallery.presets().len(), 2);
        assert_eq!(gallery.preset("star").map(|p| p.size), Some(50.0));
        assert!(gallery.preset("moon").is_none());
    }

    #[test]
    fn test_rejects_bad_json_and_sizes() {
        assert!(ShapeGallery::from_json("{").is_err());
        assert_eq!(
            ShapeGallery::from_json(r#"[{"name": "x", "svg": "", "size": 0.0}]"#).unwrap_err(),
            GeometryError::InvalidWidth(0.0)
        );
    }

    #[test]
    fn test_newest_cut_first() {
        let mut gallery = ShapeGallery::default();
        let first = Cut::new(Outline::default(), None, None);
        let second = Cut::new(Outline::default(), None, Some("AB".to_string()));
        let second_id = second.id;
        gallery.add_cut(first);
        gallery.add_cut(second);

        assert_eq!(gallery.cuts().len(), 2);
        assert_eq!(gallery.cuts()[0].id, second_id);
        assert_eq!(
            gallery.cut(second_id).and_then(|c| c.initials.as_deref()),
            Some("AB")
        );
    }

    #[test]
    fn test_time_label() {
        let mut cut = Cut::new(Outline::default(), None, None);
        cut.created = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(cut.time_label(), "07:05");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shapes.json");
        std::fs::write(&path, PRESETS).unwrap();
        assert_eq!(ShapeGallery::load(&path).unwrap().presets().len(), 2);
    }
}
