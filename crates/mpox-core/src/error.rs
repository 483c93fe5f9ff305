//! Error types for the mpox-core library.

use thiserror::Error;

use mpox_inference::InferenceError;

/// Main error type for the mpox library.
#[derive(Error, Debug)]
pub enum MpoxError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning a bitmap into a model tensor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    /// The bitmap could not be resampled to the model's input size.
    #[error("failed to resize {width}x{height} image: {reason}")]
    ResizeFailed {
        width: u32,
        height: u32,
        reason: String,
    },

    /// The raw pixel buffer is missing or does not cover the bitmap.
    #[error("pixel buffer unavailable: {0}")]
    BufferUnavailable(String),
}

/// Errors returned by a single prediction call.
///
/// None of these are fatal to the process; the caller may retry with a new
/// call.
#[derive(Error, Debug)]
pub enum PredictionError {
    /// The model could not be acquired. Nothing else was attempted.
    #[error("failed to load model: {0}")]
    ModelLoadFailed(#[source] InferenceError),

    /// The image could not be encoded. The model was not invoked.
    #[error("failed to prepare image: {0}")]
    PreprocessingFailed(#[from] PreprocessError),

    /// Binding, execution or output extraction failed.
    #[error("inference failed: {0}")]
    InferenceFailed(#[source] InferenceError),
}

impl PredictionError {
    /// Plain-text message to show in place of a prediction.
    pub fn user_message(&self) -> String {
        match self {
            PredictionError::ModelLoadFailed(_) => "Failed to load the model.".to_string(),
            PredictionError::PreprocessingFailed(_) => {
                "Failed to prepare image for model.".to_string()
            }
            PredictionError::InferenceFailed(e) => {
                format!("Failed to prepare image or make prediction: {}", e)
            }
        }
    }
}

/// Result type for the mpox library.
pub type Result<T> = std::result::Result<T, MpoxError>;
