use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use drawcut::{
    init_logging, CalibrationState, Config, CutterController, FileShapeFetcher, Workbench,
    BUILD_DATE, VERSION,
};
use drawcut_communication::{controller_channel, CalibrationSequences, GrblDevice};
use drawcut_designer::font_manager::list_font_families;
use drawcut_designer::{FontGlyphSource, ShapeGallery};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "drawcut", version)]
#[command(about = "Outline drawn shapes and cut them on a GRBL machine")]
struct Cli {
    /// Settings file (.toml or .json); defaults to the platform config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Font family for engraved initials
    #[arg(long, global = true, default_value = "Sans")]
    font: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Write the cut program for an SVG shape without a machine
    Outline {
        svg: PathBuf,
        /// Nominal size of the larger side in mm
        #[arg(long)]
        size: Option<f64>,
        #[arg(long)]
        initials: Option<String>,
    },
    /// Calibrate the cutter and cut an SVG shape
    Cut {
        svg: PathBuf,
        #[arg(long)]
        size: Option<f64>,
        #[arg(long)]
        initials: Option<String>,
    },
    /// Calibrate the cutter and level the stock
    Even,
    /// Write the default settings file
    InitConfig,
    /// List the font families available for initials
    Fonts,
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(drawcut_settings::default_config_path()?),
    }
}

fn workbench(config: Config, font: &str) -> Result<Workbench> {
    let gallery = match &config.output.presets_file {
        Some(path) => ShapeGallery::load(path)
            .with_context(|| format!("loading presets from {}", path.display()))?,
        None => ShapeGallery::default(),
    };
    let fetcher = Arc::new(FileShapeFetcher::new(config.output.shapes_dir.clone()));
    let mut bench = Workbench::new(config, gallery, fetcher)?;
    let tolerance = bench.config().initials.flattening_tolerance;
    match FontGlyphSource::from_system(font, true, tolerance) {
        Ok(glyphs) => bench = bench.with_glyph_source(Arc::new(glyphs)),
        Err(e) => warn!("Initials disabled: {}", e),
    }
    Ok(bench)
}

fn load_shape(
    bench: &mut Workbench,
    svg: &Path,
    size: Option<f64>,
    initials: Option<String>,
) -> Result<()> {
    let text = std::fs::read_to_string(svg)
        .with_context(|| format!("reading {}", svg.display()))?;
    let size = size.unwrap_or(bench.config().material.size_x);
    let drawing = bench.shape_imported(&text, size)?;
    info!("Outline has {} contours", drawing.outline.len());
    bench.set_initials(initials);
    Ok(())
}

/// Open the cutter and wait for calibration to finish.
async fn calibrated(config: Config, font: &str) -> Result<Workbench> {
    let (sink, inbox) = controller_channel();
    let device = GrblDevice::open(&config.connection, sink)?;
    let sequences = CalibrationSequences::new(config.calibration);
    let cutter = CutterController::spawn(Arc::new(device), sequences, inbox);

    info!("Calibrating cutter");
    if cutter.wait_until_settled().await != CalibrationState::Ready {
        let session = cutter.shutdown().await?;
        match session.failure() {
            Some(e) => bail!("Calibration failed: {}", e),
            None => bail!("Calibration stopped in {}", session.state()),
        }
    }
    Ok(workbench(config, font)?.with_cutter(cutter))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    info!("DrawCut {} (built {})", VERSION, BUILD_DATE);

    let path = config_path(&cli)?;
    let config = match cli.action {
        Action::InitConfig => {
            Config::default().save_to_file(&path)?;
            println!("{}", path.display());
            return Ok(());
        }
        Action::Fonts => {
            for family in list_font_families() {
                println!("{}", family);
            }
            return Ok(());
        }
        _ => Config::load_or_default(&path)?,
    };

    match cli.action {
        Action::InitConfig | Action::Fonts => return Ok(()),
        Action::Outline { svg, size, initials } => {
            let mut bench = workbench(config, &cli.font)?;
            load_shape(&mut bench, &svg, size, initials)?;
            bench.cut_requested()?;
            println!("{}", bench.config().output.program_file.display());
            return Ok(());
        }
        Action::Cut { svg, size, initials } => {
            let mut bench = calibrated(config, &cli.font).await?;
            load_shape(&mut bench, &svg, size, initials)?;
            let cut = bench.cut_requested()?;
            info!("Cut {} started at {}", cut.id, cut.time_label());
        }
        Action::Even => {
            let mut bench = calibrated(config, &cli.font).await?;
            bench.even_surface_requested()?;
        }
    }

    info!("Streaming; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    Ok(())
}
