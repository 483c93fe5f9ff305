//! Inspect command - show a model's input/output schema.

use std::path::PathBuf;

use clap::Args;
use console::style;

use mpox_core::{InferenceBackend, OrtBackend};

use super::load_config;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Model file (overrides the configured path)
    #[arg(short, long)]
    model: Option<PathBuf>,
}

pub async fn run(args: InspectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let model_path = args.model.unwrap_or(config.model.model_path);

    if !model_path.exists() {
        anyhow::bail!("Model file not found: {}", model_path.display());
    }

    let backend = OrtBackend::from_file_with_threads(&model_path, config.model.num_threads)?;

    println!("Model: {}", model_path.display());
    print_names("Inputs", backend.input_names(), &config.model.input_name);
    print_names("Outputs", backend.output_names(), &config.model.output_name);

    Ok(())
}

fn print_names(title: &str, names: &[String], configured: &str) {
    println!("{}:", title);
    for name in names {
        if name == configured {
            println!("  {} {} (configured)", style("✓").green(), name);
        } else {
            println!("    {}", name);
        }
    }
    if !names.iter().any(|n| n == configured) {
        println!(
            "  {} configured name '{}' not found",
            style("✗").red(),
            configured
        );
    }
}
