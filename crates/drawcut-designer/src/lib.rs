//! # DrawCut Designer
//!
//! Everything between a drawn shape and the contours the tool follows.
//!
//! ## Components
//!
//! - **Paths**: closed drawing paths built from lines and curves
//! - **Geometry**: buffering, boolean union and flattening of areas
//! - **Outliner**: line and filled tool outlines
//! - **Text**: glyph outlines for engraved initials
//! - **Import**: SVG path data placed on the material
//! - **Gallery**: preset shapes and recorded cuts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use drawcut_designer::{DrawPath, Outliner, OutlinerConfig};
//!
//! let outliner = Outliner::new(OutlinerConfig {
//!     tool_diameter: 3.175,
//!     motif_width: 4.0,
//!     flattening_tolerance: 0.05,
//! })?;
//! let outline = outliner.generate_outline(&path)?;
//! ```

pub mod font_manager;
pub mod gallery;
pub mod geometry;
pub mod import;
pub mod outliner;
pub mod path;
pub mod text;

pub use gallery::{Cut, PresetShape, ShapeGallery};
pub use geometry::{Contour, Point};
pub use import::{parse_path_data, ShapeImporter};
pub use outliner::{Outline, Outliner, OutlinerConfig};
pub use path::{DrawPath, PathBuilder};
pub use text::{group_glyph_contours, FontGlyphSource, Glyph, GlyphSource};
