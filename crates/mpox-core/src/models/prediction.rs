//! Prediction results as shown to the user.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PredictionError;

/// Decoded value of the model's designated output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionValue {
    /// A named class with its score.
    Label { label: String, score: f32 },

    /// Raw output values when no labels are configured.
    Scores { values: Vec<f32> },
}

impl fmt::Display for PredictionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionValue::Label { label, .. } => f.write_str(label),
            PredictionValue::Scores { values } => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:.4}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Successful result of one prediction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Model output the value was read from.
    pub output: String,

    /// Decoded value.
    pub value: PredictionValue,

    /// Wall time of the call in milliseconds.
    pub elapsed_ms: u64,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prediction: {}", self.value)
    }
}

/// Render a prediction call's outcome as display text.
pub fn describe(result: &Result<Prediction, PredictionError>) -> String {
    match result {
        Ok(prediction) => prediction.to_string(),
        Err(e) => e.user_message(),
    }
}
