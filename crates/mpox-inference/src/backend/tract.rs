//! Tract backend for cross-platform ONNX inference.

use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use tract_onnx::prelude::*;
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor};
use crate::{InferenceBackend, Result};

/// Default input shape: one 300x300 RGB image, channel-last.
pub const DEFAULT_INPUT_SHAPE: [usize; 4] = [1, 300, 300, 3];

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Backend using Tract for cross-platform ONNX inference.
///
/// The input shape is fixed when the plan is built, so a tensor of any other
/// shape is rejected by tract at run time instead of being reinterpreted.
pub struct TractBackend {
    model: Plan,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl TractBackend {
    /// Load a model from a file path with the default input shape.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file_with_shape(path, &DEFAULT_INPUT_SHAPE)
    }

    /// Load a model from a file path with specified input shape.
    pub fn from_file_with_shape<P: AsRef<Path>>(path: P, input_shape: &[usize]) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model with Tract from: {}", path.display());

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        Self::build(model, input_shape)
    }

    /// Load a model from bytes with the default input shape.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_shape(bytes, &DEFAULT_INPUT_SHAPE)
    }

    /// Load a model from bytes with specified input shape.
    pub fn from_bytes_with_shape(bytes: &[u8], input_shape: &[usize]) -> Result<Self> {
        debug!("Loading ONNX model with Tract from {} bytes", bytes.len());

        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        Self::build(model, input_shape)
    }

    fn build(mut model: InferenceModel, input_shape: &[usize]) -> Result<Self> {
        let input_names = outlet_names(&model, true)?;
        let output_names = outlet_names(&model, false)?;

        // Pin the input to a concrete shape so dynamic dimensions resolve.
        model
            .set_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), input_shape))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to set input shape: {}", e)))?;

        let model = model
            .into_typed()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to type model: {}", e)))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to optimize: {}", e)))?
            .into_runnable()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        debug!("Model inputs: {:?}", input_names);
        debug!("Model outputs: {:?}", output_names);

        Ok(Self {
            model,
            input_names,
            output_names,
        })
    }

    fn convert_input(tensor: &InputTensor) -> Result<TValue> {
        let arr = tract_ndarray::ArrayD::from_shape_vec(
            tract_ndarray::IxDyn(tensor.shape()),
            tensor.to_vec(),
        )
        .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
        Ok(arr.into_tvalue())
    }
}

fn outlet_names(model: &InferenceModel, inputs: bool) -> Result<Vec<String>> {
    let outlets = if inputs {
        model.input_outlets()
    } else {
        model.output_outlets()
    }
    .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

    Ok(outlets
        .iter()
        .map(|outlet| {
            model
                .outlet_label(*outlet)
                .map(str::to_string)
                .unwrap_or_else(|| model.node(outlet.node).name.clone())
        })
        .collect())
}

fn to_array<T: Clone>(shape: &[usize], data: Vec<T>) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(shape), data)
        .map_err(|e| InferenceError::OutputExtraction(e.to_string()))
}

impl InferenceBackend for TractBackend {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>> {
        if inputs.len() != self.input_names.len() {
            return Err(InferenceError::InvalidInput(format!(
                "model takes {} input(s), got {}",
                self.input_names.len(),
                inputs.len()
            )));
        }

        // Tract binds positionally; order the tensors by declared input name.
        let tract_inputs: TVec<TValue> = self
            .input_names
            .iter()
            .map(|expected| {
                let (_, tensor) = inputs
                    .iter()
                    .find(|(name, _)| *name == expected.as_str())
                    .ok_or_else(|| InferenceError::InvalidInput(format!("missing input '{}'", expected)))?;
                Self::convert_input(tensor)
            })
            .collect::<Result<TVec<_>>>()?;

        let outputs = self
            .model
            .run(tract_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());

        for (idx, output) in outputs.iter().enumerate() {
            let name = self
                .output_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("output_{}", idx));

            let tensor = if let Ok(view) = output.to_array_view::<f32>() {
                OutputTensor::Float32(to_array(view.shape(), view.iter().copied().collect())?)
            } else if let Ok(view) = output.to_array_view::<i64>() {
                OutputTensor::Int64(to_array(view.shape(), view.iter().copied().collect())?)
            } else if let Ok(view) = output.to_array_view::<i32>() {
                OutputTensor::Int32(to_array(view.shape(), view.iter().copied().collect())?)
            } else if let Ok(view) = output.to_array_view::<f64>() {
                OutputTensor::Float64(to_array(view.shape(), view.iter().copied().collect())?)
            } else {
                return Err(InferenceError::OutputExtraction(format!(
                    "unsupported output type for '{}'",
                    name
                )));
            };

            results.push((name, tensor));
        }

        Ok(results)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
