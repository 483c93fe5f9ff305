//! Data models: bitmaps, predictions and configuration.

pub mod bitmap;
pub mod config;
pub mod prediction;

pub use bitmap::{Bitmap, PixelLayout, BYTES_PER_PIXEL};
pub use config::{ModelConfig, MpoxConfig, OutputConfig, PreprocessConfig, ResizeFilter};
pub use prediction::{describe, Prediction, PredictionValue};
