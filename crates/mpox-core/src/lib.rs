//! Core library for on-device mpox photo classification.
//!
//! This crate provides:
//! - A borrowed bitmap view over BGRA/RGBA/ARGB/ABGR pixel buffers
//! - The tensor encoder producing `[1, 300, 300, 3]` channel-last RGB input
//! - The inference runner binding that tensor to an ONNX classifier
//! - Typed errors and display text for every failure path

pub mod classify;
pub mod error;
pub mod models;

pub use classify::{Classifier, ModelHandle, OutputDecoder, TensorEncoder};
pub use error::{MpoxError, PredictionError, PreprocessError, Result};
pub use models::{
    describe, Bitmap, MpoxConfig, PixelLayout, Prediction, PredictionValue, ResizeFilter,
};

/// Re-export inference types.
pub use mpox_inference::{InferenceBackend, InferenceError, InputTensor, OutputTensor};

#[cfg(feature = "native")]
pub use mpox_inference::OrtBackend;

#[cfg(feature = "wasm")]
pub use mpox_inference::TractBackend;
