//! Configuration structures for the classification pipeline.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{MpoxError, Result};

/// Main configuration for the mpox pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpoxConfig {
    /// Model artifact and its input/output schema.
    pub model: ModelConfig,

    /// Image-to-tensor settings.
    pub preprocessing: PreprocessConfig,

    /// How the raw output is turned into a prediction.
    pub output: OutputConfig,
}

/// Model file and schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the bundled ONNX model.
    pub model_path: PathBuf,

    /// Name of the model's single image input.
    pub input_name: String,

    /// Name of the output carrying the classification.
    pub output_name: String,

    /// Number of CPU threads used by the runtime.
    pub num_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/mpox_model_fp32.onnx"),
            input_name: "input_1".to_string(),
            output_name: "Identity".to_string(),
            num_threads: 1,
        }
    }
}

/// Resampling filter used when stretching to the model's input size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Tensor encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Model input width in pixels.
    pub target_width: u32,

    /// Model input height in pixels.
    pub target_height: u32,

    /// Resampling filter.
    pub filter: ResizeFilter,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_width: 300,
            target_height: 300,
            filter: ResizeFilter::Bilinear,
        }
    }
}

/// Output decoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Class labels in output order. Empty means "print raw scores".
    pub labels: Vec<String>,

    /// Decision threshold for single-score (sigmoid) heads.
    pub threshold: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            threshold: 0.5,
        }
    }
}

impl MpoxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| MpoxError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| MpoxError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
