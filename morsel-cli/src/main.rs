// morsel command line interface
// Analyze food photos, fetch the detector model, inspect configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use morsel_core::{DetectorMode, FoodDetection, MorselConfig};
use morsel_eye::{build_detector, ModelManager, ObjectDetector, StaticDetector};
use morsel_pipeline::{FoodAnalyzer, InMemoryDetectionStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "morsel")]
#[command(about = "Estimate food portions and calories from a photo", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect foods in an image and estimate portions and calories
    Analyze {
        /// Image file (JPEG, PNG, ...)
        image: PathBuf,

        /// Detector back-end: cloud, local or auto
        #[arg(long)]
        detector: Option<DetectorMode>,

        /// Use detections from a JSON file instead of running a detector
        #[arg(long)]
        detections: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download the local detector model if it is missing
    DownloadModel,

    /// Print the effective configuration with secrets redacted
    Config,
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MorselConfig> {
    let mut config = match path {
        Some(path) => MorselConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => MorselConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

fn print_table(detection: &FoodDetection) {
    if detection.items.is_empty() {
        println!("No food detected in {}", detection.filename);
        return;
    }

    println!(
        "{:<24} {:<10} {:>7} {:>8} {:>6}  {}",
        "FOOD", "CATEGORY", "GRAMS", "KCAL", "CONF", "METHOD"
    );
    for item in &detection.items {
        let method = match &item.reference_object {
            Some(reference) => format!("{} ({})", item.estimation_method, reference),
            None => item.estimation_method.to_string(),
        };
        println!(
            "{:<24} {:<10} {:>7.0} {:>8.1} {:>6.2}  {}",
            item.name, item.category, item.estimated_grams, item.estimated_calories, item.confidence, method
        );
    }
    println!("Total: {:.1} kcal", detection.total_calories());
}

async fn analyze(
    config: MorselConfig,
    image: &Path,
    detector_mode: Option<DetectorMode>,
    detections: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = config;
    if let Some(mode) = detector_mode {
        config.detection.mode = mode;
    }
    config.validate()?;

    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read image {:?}", image))?;

    let detector: Arc<dyn ObjectDetector> = match detections {
        Some(path) => Arc::new(StaticDetector::from_json_file(path)?),
        None => build_detector(&config.detection)?,
    };
    let analyzer = FoodAnalyzer::with_detector(detector, &config)?;
    info!("Analyzing {:?} with the {} detector", image, analyzer.detector_name());

    let filename = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.display().to_string());
    let store = InMemoryDetectionStore::new();
    let detection = analyzer
        .analyze_and_record(&store, &bytes, &filename, content_type_for(image))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
    } else {
        print_table(&detection);
    }
    Ok(())
}

async fn download_model(config: MorselConfig) -> anyhow::Result<()> {
    let manager = ModelManager::new(&config.detection.model_dir);
    let path = manager.ensure_detector_model(&config.detection).await?;
    println!("Detector model ready at {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            image,
            detector,
            detections,
            json,
        } => analyze(config, &image, detector, detections.as_deref(), json).await?,
        Commands::DownloadModel => download_model(config).await?,
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config.redacted())?),
    }
    Ok(())
}
