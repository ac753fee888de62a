//! Workbench
//!
//! Ties the pieces together the way the operator uses them: draw or load a
//! shape, look at its outline, cut it. Every action is a method; the caller
//! decides when to invoke it. Programs are written to disk before they are
//! handed to the cutter, and shape downloads run as background tasks whose
//! results come back through [`Workbench::next_download`].

use std::path::Path;
use std::sync::Arc;

use drawcut_camtools::{CamToolError, CutProgramGenerator, SurfaceEvener};
use drawcut_communication::{CalibrationState, CutterHandle};
use drawcut_core::{BackgroundTask, ControllerError, GeometryError, MotionProgram};
use drawcut_designer::{
    Contour, Cut, DrawPath, GlyphSource, Outline, Outliner, OutlinerConfig, ShapeGallery,
    ShapeImporter,
};
use drawcut_settings::Config;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::fetch::{ShapeFetchError, ShapeFetcher};

#[derive(Error, Debug)]
pub enum WorkbenchError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    CamTool(#[from] CamToolError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Fetch(#[from] ShapeFetchError),

    #[error("Nothing to cut: draw or load a shape first")]
    NothingToCut,

    #[error("Cutter is not ready ({0})")]
    NotReady(CalibrationState),

    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("Unknown cut {0}")]
    UnknownCut(Uuid),
}

/// The shape currently on the drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub outline: Outline,
    pub hole: Option<Contour>,
    pub initials: Option<String>,
}

/// Result of a shape download.
#[derive(Debug)]
pub struct ShapeDownload {
    /// Scan this download belongs to.
    pub generation: u64,
    pub id: String,
    pub result: Result<String, ShapeFetchError>,
}

pub struct Workbench {
    config: Config,
    outliner: Outliner,
    generator: CutProgramGenerator,
    importer: ShapeImporter,
    gallery: ShapeGallery,
    fetcher: Arc<dyn ShapeFetcher>,
    cutter: Option<CutterHandle>,
    downloads_tx: mpsc::UnboundedSender<ShapeDownload>,
    downloads_rx: mpsc::UnboundedReceiver<ShapeDownload>,
    download: Option<BackgroundTask>,
    generation: u64,
    drawing: Option<Drawing>,
    status: Option<String>,
}

impl Workbench {
    pub fn new(
        config: Config,
        gallery: ShapeGallery,
        fetcher: Arc<dyn ShapeFetcher>,
    ) -> Result<Self, WorkbenchError> {
        let tolerance = config.initials.flattening_tolerance;
        let outliner = Outliner::new(OutlinerConfig::from_params(&config.machining, tolerance))?;
        let generator = CutProgramGenerator::new(config.initials.clone());
        let importer = ShapeImporter::new(config.material, tolerance);
        let (downloads_tx, downloads_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            outliner,
            generator,
            importer,
            gallery,
            fetcher,
            cutter: None,
            downloads_tx,
            downloads_rx,
            download: None,
            generation: 0,
            drawing: None,
            status: None,
        })
    }

    /// Stream programs to this cutter.
    pub fn with_cutter(mut self, cutter: CutterHandle) -> Self {
        self.cutter = Some(cutter);
        self
    }

    /// Outline initials with `source`.
    pub fn with_glyph_source(mut self, source: Arc<dyn GlyphSource>) -> Self {
        self.generator = CutProgramGenerator::new(self.config.initials.clone())
            .with_glyph_source(source);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cutter(&self) -> Option<&CutterHandle> {
        self.cutter.as_ref()
    }

    pub fn gallery(&self) -> &ShapeGallery {
        &self.gallery
    }

    pub fn drawing(&self) -> Option<&Drawing> {
        self.drawing.as_ref()
    }

    /// Last message for the operator, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The cutter is calibrated, or there is no cutter to wait for.
    pub fn can_cut(&self) -> bool {
        self.drawing.is_some() && self.cutter.as_ref().is_none_or(CutterHandle::is_ready)
    }

    /// Outline a freehand stroke.
    pub fn path_drawn(&mut self, path: &DrawPath) -> Result<&Drawing, WorkbenchError> {
        let outline = self.outliner.generate_outline(path)?;
        Ok(self.replace_drawing(outline))
    }

    /// Outline the filled area of an imported shape.
    pub fn shape_imported(&mut self, svg: &str, size: f64) -> Result<&Drawing, WorkbenchError> {
        let path = self.importer.import(svg, size)?;
        let outline = self.outliner.generate_filled_outline(&path)?;
        Ok(self.replace_drawing(outline))
    }

    fn replace_drawing(&mut self, outline: Outline) -> &Drawing {
        let (hole, initials) = match self.drawing.take() {
            Some(previous) => (previous.hole, previous.initials),
            None => (None, None),
        };
        self.status = None;
        self.drawing.insert(Drawing {
            outline,
            hole,
            initials,
        })
    }

    pub fn set_hole(&mut self, hole: Option<Contour>) {
        if let Some(drawing) = self.drawing.as_mut() {
            drawing.hole = hole;
        }
    }

    pub fn set_initials(&mut self, initials: Option<String>) {
        let initials = initials.filter(|text| !text.trim().is_empty());
        if let Some(drawing) = self.drawing.as_mut() {
            drawing.initials = initials;
        }
    }

    pub fn preset_selected(&mut self, name: &str) -> Result<&Drawing, WorkbenchError> {
        let preset = self
            .gallery
            .preset(name)
            .cloned()
            .ok_or_else(|| WorkbenchError::UnknownPreset(name.to_string()))?;
        info!("Loading preset '{}'", preset.name);
        self.shape_imported(&preset.svg, preset.size)
    }

    /// Put an earlier cut back on the drawing surface.
    pub fn cut_selected(&mut self, id: Uuid) -> Result<&Drawing, WorkbenchError> {
        let cut = self.gallery.cut(id).ok_or(WorkbenchError::UnknownCut(id))?;
        let drawing = Drawing {
            outline: cut.outline.clone(),
            hole: cut.hole.clone(),
            initials: cut.initials.clone(),
        };
        self.status = None;
        Ok(self.drawing.insert(drawing))
    }

    fn ensure_cutter_ready(&self) -> Result<(), WorkbenchError> {
        match &self.cutter {
            Some(cutter) if !cutter.is_ready() => {
                Err(WorkbenchError::NotReady(cutter.state()))
            }
            _ => Ok(()),
        }
    }

    /// Generate the cut program for the current drawing, record the cut,
    /// write the program file and stream it.
    pub fn cut_requested(&mut self) -> Result<Cut, WorkbenchError> {
        self.ensure_cutter_ready()?;
        let drawing = self.drawing.as_ref().ok_or(WorkbenchError::NothingToCut)?;
        let program = self.generator.generate(
            &drawing.outline,
            drawing.hole.as_ref(),
            drawing.initials.as_deref(),
            &self.config.machining,
        )?;

        let cut = Cut::new(
            drawing.outline.clone(),
            drawing.hole.clone(),
            drawing.initials.clone(),
        );
        self.gallery.add_cut(cut.clone());

        let path = self.config.output.program_file.clone();
        self.write_and_send(&program, &path)?;
        Ok(cut)
    }

    /// Level the stock top.
    pub fn even_surface_requested(&mut self) -> Result<MotionProgram, WorkbenchError> {
        self.ensure_cutter_ready()?;
        let program = SurfaceEvener::new(self.config.surfacing.clone())
            .generate(&self.config.material, &self.config.machining)?;
        let path = self.config.output.surfacing_file.clone();
        self.write_and_send(&program, &path)?;
        Ok(program)
    }

    fn write_and_send(&mut self, program: &MotionProgram, path: &Path) -> Result<(), WorkbenchError> {
        if let Err(e) = program.write_to_file(path) {
            error!("Failed to write {}: {}", path.display(), e);
            self.status = Some(format!("Could not save {}", path.display()));
        }
        match &self.cutter {
            Some(cutter) => cutter.send_program(program.lines())?,
            None => warn!("No cutter attached; program only written to {}", path.display()),
        }
        Ok(())
    }

    /// Start loading the shape behind a scanned code, replacing any
    /// download still running.
    pub fn code_scanned(&mut self, id: &str) {
        if let Some(task) = self.download.take() {
            task.cancel();
        }
        self.generation += 1;
        let generation = self.generation;
        let fetcher = Arc::clone(&self.fetcher);
        let id = id.trim().to_string();
        let job_id = id.clone();
        self.status = Some("Loading".to_string());
        self.download = Some(BackgroundTask::spawn(
            format!("shape {}", id),
            async move { fetcher.fetch(&job_id).await },
            self.downloads_tx.clone(),
            move |result| ShapeDownload {
                generation,
                id,
                result,
            },
        ));
    }

    /// Wait for the download of the latest scan and apply it. Results of
    /// earlier scans are discarded.
    pub async fn next_download(&mut self) -> Option<Result<&Drawing, WorkbenchError>> {
        loop {
            let download = self.downloads_rx.recv().await?;
            if download.generation == self.generation {
                self.download = None;
                return Some(self.apply_download(download));
            }
            debug!("Discarding superseded download of shape {}", download.id);
        }
    }

    fn apply_download(&mut self, download: ShapeDownload) -> Result<&Drawing, WorkbenchError> {
        match download.result {
            Ok(svg) => {
                info!("Loaded scanned shape {}", download.id);
                let size = self.config.material.size_x;
                self.shape_imported(&svg, size)
            }
            Err(e) => {
                warn!("Loading shape {} failed: {}", download.id, e);
                self.status = Some(e.status_message());
                Err(e.into())
            }
        }
    }
}
