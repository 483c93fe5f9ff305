//! Tensor types for inference input/output.

use ndarray::ArrayD;

/// Supported output tensor data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorType {
    Float32,
    Float64,
    Int32,
    Int64,
}

/// Input tensor for inference.
///
/// Image classifiers take a single dense `f32` tensor, so that is the only
/// input representation carried across the backend boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: ArrayD<f32>,
}

impl InputTensor {
    /// Wrap an existing array.
    pub fn from_array(data: ArrayD<f32>) -> Self {
        Self { data }
    }

    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Borrow the underlying array.
    pub fn array(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Copy the elements out in logical (row-major) order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

impl From<ArrayD<f32>> for InputTensor {
    fn from(data: ArrayD<f32>) -> Self {
        Self::from_array(data)
    }
}

/// Output tensor from inference.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTensor {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
}

impl OutputTensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            OutputTensor::Float32(arr) => arr.shape(),
            OutputTensor::Float64(arr) => arr.shape(),
            OutputTensor::Int32(arr) => arr.shape(),
            OutputTensor::Int64(arr) => arr.shape(),
        }
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> TensorType {
        match self {
            OutputTensor::Float32(_) => TensorType::Float32,
            OutputTensor::Float64(_) => TensorType::Float64,
            OutputTensor::Int32(_) => TensorType::Int32,
            OutputTensor::Int64(_) => TensorType::Int64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Try to get the inner Float32 array.
    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            OutputTensor::Float32(arr) => Some(arr),
            _ => None,
        }
    }

    /// Flatten the values into `f32`, whatever the stored element type.
    ///
    /// Classifier heads emit either probabilities or integer class ids;
    /// both are rendered the same way downstream.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            OutputTensor::Float32(arr) => arr.iter().copied().collect(),
            OutputTensor::Float64(arr) => arr.iter().map(|&v| v as f32).collect(),
            OutputTensor::Int32(arr) => arr.iter().map(|&v| v as f32).collect(),
            OutputTensor::Int64(arr) => arr.iter().map(|&v| v as f32).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_input_from_array() {
        let tensor = InputTensor::from(ArrayD::<f32>::zeros(IxDyn(&[1, 2, 2, 3])));
        assert_eq!(tensor.shape(), &[1, 2, 2, 3]);
        assert_eq!(tensor.to_vec().len(), 12);
    }

    #[test]
    fn test_output_to_f32_vec() {
        let out = OutputTensor::Int64(ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![3, 7]).unwrap());
        assert_eq!(out.dtype(), TensorType::Int64);
        assert_eq!(out.len(), 2);
        assert_eq!(out.to_f32_vec(), vec![3.0, 7.0]);
        assert!(out.as_f32().is_none());
    }
}
