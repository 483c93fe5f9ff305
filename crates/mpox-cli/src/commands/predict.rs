//! Predict command - classify a single image.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use mpox_core::{describe, Classifier};

use super::load_config;

/// Arguments for the predict command.
#[derive(Args)]
pub struct PredictArgs {
    /// Input image (PNG, JPEG, BMP, TIFF, WebP)
    #[arg(required = true)]
    input: PathBuf,

    /// Model file (overrides the configured path)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Class labels in output order, comma separated
    #[arg(short, long, value_delimiter = ',')]
    labels: Vec<String>,

    /// Decision threshold for single-score models
    #[arg(long)]
    threshold: Option<f32>,

    /// Print the full prediction as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: PredictArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;

    if let Some(model) = args.model {
        config.model.model_path = model;
    }
    if !args.labels.is_empty() {
        config.output.labels = args.labels;
    }
    if let Some(threshold) = args.threshold {
        config.output.threshold = threshold;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Classifying {}", args.input.display());

    let image = image::open(&args.input)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;
    debug!("Decoded {}x{} image", image.width(), image.height());

    let classifier = Classifier::from_config(&config);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Processing...");
    pb.enable_steady_tick(Duration::from_millis(100));

    // Inference is blocking and CPU-bound; keep it off the async runtime.
    let result = tokio::task::spawn_blocking(move || classifier.predict_image(&image)).await?;

    pb.finish_and_clear();

    match &result {
        Ok(prediction) if args.json => println!("{}", serde_json::to_string_pretty(prediction)?),
        _ => println!("{}", describe(&result)),
    }

    result.map(|_| ()).map_err(Into::into)
}
