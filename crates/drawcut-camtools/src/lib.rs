//! # DrawCut CAM Tools
//!
//! Motion program generators:
//!
//! - **Cut program**: initials, then the hole and outline contours in
//!   depth passes
//! - **Surface evener**: serpentine raster that levels the stock before
//!   cutting

pub mod cut_program;
pub mod error;
pub mod surface_evener;

pub use cut_program::{CutProgramConfig, CutProgramGenerator};
pub use error::{CamToolError, CamToolResult};
pub use surface_evener::{SurfaceEvener, SurfacingParameters};
