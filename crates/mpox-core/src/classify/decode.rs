//! Turns the model's raw output into a prediction value.

use mpox_inference::{InferenceError, OutputTensor};

use crate::models::config::OutputConfig;
use crate::models::prediction::PredictionValue;

/// Decoder for classification outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDecoder {
    labels: Vec<String>,
    threshold: f32,
}

impl OutputDecoder {
    pub fn new(labels: Vec<String>, threshold: f32) -> Self {
        Self { labels, threshold }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.labels.clone(), config.threshold)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Decode one output tensor.
    ///
    /// Without labels the raw values are returned. A single value with two
    /// labels is read as a sigmoid score; anything else is an argmax over
    /// the values.
    pub fn decode(&self, output: &OutputTensor) -> Result<PredictionValue, InferenceError> {
        let values = output.to_f32_vec();
        if values.is_empty() {
            return Err(InferenceError::OutputExtraction(format!(
                "output tensor of shape {:?} is empty",
                output.shape()
            )));
        }

        if self.labels.is_empty() {
            return Ok(PredictionValue::Scores { values });
        }

        if values.len() == 1 && self.labels.len() == 2 {
            let score = values[0];
            let (label, score) = if score >= self.threshold {
                (&self.labels[1], score)
            } else {
                (&self.labels[0], 1.0 - score)
            };
            return Ok(PredictionValue::Label {
                label: label.clone(),
                score,
            });
        }

        let (index, score) = argmax(&values);
        let label = self
            .labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", index));

        Ok(PredictionValue::Label { label, score })
    }
}

impl Default for OutputDecoder {
    fn default() -> Self {
        Self::from_config(&OutputConfig::default())
    }
}

/// Index and value of the largest element; the first one wins ties and NaN
/// never does.
fn argmax(values: &[f32]) -> (usize, f32) {
    let mut best = (0, values[0]);
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > best.1 || best.1.is_nan() {
            best = (i, v);
        }
    }
    best
}
