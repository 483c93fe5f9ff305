//! Encode command - run only the tensor encoder and summarise the result.
//!
//! Accepts either an encoded image file or a raw pixel dump captured from a
//! platform bitmap (`--width`/`--height`/`--layout`, optional `--stride`).

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;
use ndarray::Array4;
use serde::Serialize;

use mpox_core::{Bitmap, PixelLayout, TensorEncoder};

use super::load_config;

/// Arguments for the encode command.
#[derive(Args)]
pub struct EncodeArgs {
    /// Input image, or raw pixel dump when --width is given
    #[arg(required = true)]
    input: PathBuf,

    /// Width of a raw pixel dump
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Height of a raw pixel dump
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Byte order of a raw pixel dump
    #[arg(long, default_value = "bgra", requires = "width")]
    layout: PixelLayout,

    /// Bytes per row of a raw pixel dump (default: width * 4)
    #[arg(long, requires = "width")]
    stride: Option<usize>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ChannelStats {
    channel: &'static str,
    min: f32,
    max: f32,
    mean: f32,
}

#[derive(Debug, Serialize)]
struct TensorSummary {
    source: String,
    source_size: (u32, u32),
    layout: PixelLayout,
    shape: Vec<usize>,
    channels: Vec<ChannelStats>,
}

pub async fn run(args: EncodeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let encoder = TensorEncoder::from_config(&config.preprocessing);

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let (tensor, source_size, layout) = match (args.width, args.height) {
        (Some(width), Some(height)) => {
            let data = fs::read(&args.input)?;
            let stride = args.stride.unwrap_or((width as usize).saturating_mul(4));
            let bitmap = Bitmap::new(width, height, stride, args.layout, &data);
            (encoder.encode(&bitmap)?, (width, height), args.layout)
        }
        _ => {
            let image = image::open(&args.input)
                .with_context(|| format!("Failed to decode {}", args.input.display()))?;
            let size = (image.width(), image.height());
            (encoder.encode_image(&image)?, size, PixelLayout::Rgba)
        }
    };

    let summary = TensorSummary {
        source: args.input.display().to_string(),
        source_size,
        layout,
        shape: tensor.shape().to_vec(),
        channels: channel_stats(&tensor),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} {} ({}x{}, {}) -> {:?}",
        style("✓").green(),
        summary.source,
        source_size.0,
        source_size.1,
        layout,
        summary.shape
    );
    for stats in &summary.channels {
        println!(
            "  {}: min {:.4}  max {:.4}  mean {:.4}",
            stats.channel, stats.min, stats.max, stats.mean
        );
    }

    Ok(())
}

fn channel_stats(tensor: &Array4<f32>) -> Vec<ChannelStats> {
    let pixels = (tensor.len() / 3).max(1) as f32;

    ["red", "green", "blue"]
        .into_iter()
        .enumerate()
        .map(|(c, channel)| {
            let values = tensor.index_axis(ndarray::Axis(3), c);
            let (min, max, sum) = values.iter().fold(
                (f32::INFINITY, f32::NEG_INFINITY, 0.0f64),
                |(min, max, sum), &v| (min.min(v), max.max(v), sum + v as f64),
            );
            ChannelStats {
                channel,
                min,
                max,
                mean: (sum / pixels as f64) as f32,
            }
        })
        .collect()
}
