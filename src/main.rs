//! PlateScan - command line host
//!
//! Loads an image, runs one frame operation on it and writes the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use plate_scan::config::{self, AppConfig};
use plate_scan::{PixelFrame, PlatePipeline, Rect, ScanReport};

/// Frame operation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    /// Detect plates and read them
    Process,
    /// Box blur
    Blur,
    /// Horizontal mirror
    Flip,
    /// Grayscale rendering
    Grayscale,
}

/// PlateScan - licence plate detection
#[derive(Parser, Debug)]
#[command(name = "plate-scan")]
#[command(about = "Detect licence plates and extract their text regions")]
struct Args {
    /// Input image
    input: PathBuf,

    /// Output image
    output: PathBuf,

    /// Operation to run
    #[arg(short, long, value_enum, default_value = "process")]
    operation: Operation,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to write normalized text regions to
    #[arg(long)]
    regions_dir: Option<PathBuf>,

    /// Print the scan report as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// JSON view of one reading
#[derive(Debug, Serialize)]
struct ReadingSummary {
    candidate: Rect,
    text_region: Option<Rect>,
    failure: Option<String>,
    text: String,
}

/// JSON view of a scan
#[derive(Debug, Serialize)]
struct ReportSummary {
    plates: usize,
    processing_time_ms: u64,
    readings: Vec<ReadingSummary>,
}

impl From<&ScanReport> for ReportSummary {
    fn from(report: &ScanReport) -> Self {
        Self {
            plates: report.accepted.len(),
            processing_time_ms: report.processing_time_ms,
            readings: report
                .readings
                .iter()
                .map(|reading| ReadingSummary {
                    candidate: reading.candidate,
                    text_region: reading.region.as_ref().ok().map(|r| r.source),
                    failure: reading.region.as_ref().err().map(|e| e.to_string()),
                    text: reading.text.clone(),
                })
                .collect(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_or_create_config(args.config.as_deref());
    let pipeline = PlatePipeline::with_config(&config);

    let image = image::open(&args.input)
        .with_context(|| format!("Failed to open {:?}", args.input))?
        .to_rgba8();
    let input = PixelFrame::from_rgba(&image);
    let (width, height) = input.dimensions();
    let mut output = PixelFrame::new(width, height);

    info!("Running {:?} on {}x{} frame", args.operation, width, height);

    match args.operation {
        Operation::Process => {
            let report = pipeline
                .process(&input, &mut output)
                .context("Frame could not be processed")?;
            for reading in &report.readings {
                info!("Plate at {:?}: {}", reading.candidate, reading.text);
            }
            if let Some(dir) = &args.regions_dir {
                save_regions(&report, dir)?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&ReportSummary::from(&report))?);
            }
        }
        Operation::Blur => {
            pipeline.blur(&input, &mut output);
        }
        Operation::Flip => {
            pipeline.flip(&input, &mut output);
        }
        Operation::Grayscale => {
            pipeline.grayscale(&input, &mut output);
        }
    }

    output
        .to_rgba()?
        .save(&args.output)
        .with_context(|| format!("Failed to write {:?}", args.output))?;
    info!("Wrote {:?}", args.output);

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config(explicit: Option<&Path>) -> AppConfig {
    if let Some(path) = explicit {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => warn!("Failed to load {:?}: {}", path, e),
        }
    } else if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        } else if let Err(e) = config::save_config(&AppConfig::default(), &config_path) {
            warn!("Failed to write default configuration: {}", e);
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Write each normalized text region as a PNG
fn save_regions(report: &ScanReport, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (index, reading) in report.readings.iter().enumerate() {
        if let Ok(region) = &reading.region {
            let path = dir.join(format!("region_{:02}.png", index));
            region
                .image
                .save(&path)
                .with_context(|| format!("Failed to write {:?}", path))?;
        }
    }
    Ok(())
}
