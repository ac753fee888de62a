//! # DrawCut
//!
//! Draw a shape, outline it for the tool and cut it on a GRBL machine.
//!
//! ## Architecture
//!
//! DrawCut is organized as a workspace with multiple crates:
//!
//! 1. **drawcut-core** - Errors, machining parameters, motion programs, background tasks
//! 2. **drawcut-designer** - Geometry kernel, outliner, SVG import, glyph outlines, gallery
//! 3. **drawcut-camtools** - Cut program and surface evener generators
//! 4. **drawcut-communication** - Cutter calibration controller and GRBL device
//! 5. **drawcut-settings** - Configuration files
//! 6. **drawcut** - Workbench and command line binary

pub mod fetch;
pub mod workbench;

pub use drawcut_communication::{CalibrationState, CutterController, CutterHandle};
pub use drawcut_core::{Error, Result};
pub use drawcut_settings::Config;
pub use fetch::{FileShapeFetcher, ShapeFetchError, ShapeFetcher};
pub use workbench::{Drawing, ShapeDownload, Workbench, WorkbenchError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Console output with pretty formatting, filtered by `RUST_LOG` and
/// defaulting to `info`.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
