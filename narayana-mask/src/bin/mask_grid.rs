//! Render the saliency masks of one or more images as a thumbnail grid

use anyhow::Context;
use clap::Parser;
use narayana_mask::canvas::ImageCanvas;
use narayana_mask::config::MaskConfig;
use narayana_mask::error::MaskError;
use narayana_mask::frame::RawImage;
use narayana_mask::models::{ModelSlot, OnnxSegmentationModel};
use narayana_mask::pipeline::{FrameOutcome, MaskPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mask-grid")]
#[command(about = "Salient object masks laid out as a grid", long_about = None)]
#[command(version)]
struct Cli {
    /// Images to segment, one pass each
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// ONNX model file (overrides model_path in the config)
    #[arg(long, short)]
    model: Option<PathBuf>,

    /// Where to write the canvas of the last pass
    #[arg(long, short, default_value = "masks.png")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Cells per row
    #[arg(long)]
    columns: Option<u32>,

    /// Print pass reports as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => MaskConfig::load(path)?,
        None => MaskConfig::default(),
    };
    if let Some(columns) = cli.columns {
        config.columns = columns;
    }
    if let Some(model) = cli.model {
        config.model_path = Some(model);
    }
    // overrides are checked before the canvas is allocated
    config.validate().map_err(MaskError::Config)?;

    let model_path = config
        .model_path
        .clone()
        .context("no model given, pass --model or set model_path in the config")?;

    let slot = ModelSlot::empty();
    let canvas = ImageCanvas::from_config(&config)?;
    let pipeline = MaskPipeline::new(config, slot.clone())?;
    pipeline.attach_surface(canvas).await;

    let model = OnnxSegmentationModel::from_file(&model_path)
        .with_context(|| format!("loading {:?}", model_path))?;
    slot.install(Arc::new(model))?;

    for path in &cli.images {
        let image = match RawImage::open(path) {
            Ok(image) => image.with_ledger(&pipeline.ledger()),
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        let report = match pipeline.handle_frame(image).await {
            FrameOutcome::Finished(report) => report,
            FrameOutcome::Dropped => continue,
        };

        if cli.json {
            println!("{}", serde_json::to_string(&report)?);
        } else if let Some(notice) = &report.notice {
            println!("{:?}: {} - {}", path, notice.title, notice.message);
        } else {
            println!("{:?}: {} masks", path, report.placed.len());
        }
    }

    if let Some(saved) = pipeline.with_surface(|canvas| canvas.save(&cli.output)).await {
        saved?;
        info!("Canvas written to {:?}", cli.output);
    }

    let ledger = pipeline.ledger();
    info!(
        "Resources acquired {}, released {}",
        ledger.acquired(),
        ledger.released()
    );

    Ok(())
}
