//! End-to-end runs through the classifier with an in-process model.

use std::sync::Mutex;

use ndarray::{ArrayD, IxDyn};

use mpox_core::{
    describe, Bitmap, Classifier, InferenceBackend, InferenceError, InputTensor, MpoxConfig,
    OutputTensor, PixelLayout, PredictionError,
};

/// Records the tensor it is fed and answers with a one-hot score vector.
struct RecordingModel {
    seen: Mutex<Vec<InputTensor>>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl RecordingModel {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            inputs: vec!["input_1".to_string()],
            outputs: vec!["Identity".to_string()],
        }
    }
}

impl InferenceBackend for RecordingModel {
    fn run(
        &self,
        inputs: &[(&str, InputTensor)],
    ) -> mpox_inference::Result<Vec<(String, OutputTensor)>> {
        self.seen.lock().unwrap().push(inputs[0].1.clone());
        let scores = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.0f32, 1.0]).unwrap();
        Ok(vec![("Identity".to_string(), OutputTensor::Float32(scores))])
    }

    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }
}

fn labelled_config() -> MpoxConfig {
    let mut config = MpoxConfig::default();
    config.output.labels = vec!["Normal".to_string(), "Monkeypox".to_string()];
    config
}

#[test]
fn black_image_yields_zero_tensor_and_label() {
    let classifier = Classifier::new(RecordingModel::new()).with_config(&labelled_config());
    let black = [0u8, 0, 0, 255].repeat(300 * 300);
    let bitmap = Bitmap::packed(300, 300, PixelLayout::Bgra, &black);

    let result = classifier.predict(&bitmap);
    assert_eq!(describe(&result), "Prediction: Monkeypox");

    let backend = classifier.model().get().unwrap();
    let seen = backend.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].shape(), &[1, 300, 300, 3]);
    assert!(seen[0].array().iter().all(|&v| v == 0.0));
}

#[test]
fn buffer_failure_is_reported_not_raised() {
    let classifier = Classifier::new(RecordingModel::new()).with_config(&labelled_config());

    let result = classifier.predict(&Bitmap::unavailable(640, 480, PixelLayout::Bgra));

    assert!(matches!(result, Err(PredictionError::PreprocessingFailed(_))));
    assert_eq!(describe(&result), "Failed to prepare image for model.");
    assert!(classifier.model().get().unwrap().seen.lock().unwrap().is_empty());
}

#[test]
fn load_failure_is_reported() {
    let classifier: Classifier<RecordingModel> =
        Classifier::lazy(|| Err(InferenceError::ModelLoad("no such file".to_string())));
    let pixels = [255u8; 4 * 4 * 4];

    let result = classifier.predict(&Bitmap::packed(4, 4, PixelLayout::Rgba, &pixels));

    assert!(matches!(result, Err(PredictionError::ModelLoadFailed(_))));
    assert_eq!(describe(&result), "Failed to load the model.");
}
