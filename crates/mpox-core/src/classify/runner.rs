//! Inference runner: model acquisition, encoding, execution and decoding.

use std::sync::OnceLock;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info};

use mpox_inference::{InferenceBackend, InferenceError, InputTensor};

use crate::error::PredictionError;
use crate::models::bitmap::Bitmap;
use crate::models::config::{ModelConfig, MpoxConfig};
use crate::models::prediction::Prediction;

use super::decode::OutputDecoder;
use super::preprocessing::TensorEncoder;

type Loader<B> = Box<dyn Fn() -> mpox_inference::Result<B> + Send + Sync>;

/// Holds a model that is either already loaded or loaded on first use.
///
/// Once loaded the model is never replaced or mutated. A failed load is not
/// cached; the next call tries again.
pub struct ModelHandle<B: InferenceBackend> {
    model: OnceLock<B>,
    loader: Option<Loader<B>>,
}

impl<B: InferenceBackend> ModelHandle<B> {
    /// Wrap a model that is already loaded.
    pub fn loaded(backend: B) -> Self {
        Self {
            model: OnceLock::from(backend),
            loader: None,
        }
    }

    /// Defer loading until the first prediction.
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> mpox_inference::Result<B> + Send + Sync + 'static,
    {
        Self {
            model: OnceLock::new(),
            loader: Some(Box::new(loader)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Get the model, loading it if needed.
    pub fn get(&self) -> mpox_inference::Result<&B> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| InferenceError::ModelLoad("no model source configured".to_string()))?;

        let backend = loader()?;
        debug!(
            "Model loaded: inputs {:?}, outputs {:?}",
            backend.input_names(),
            backend.output_names()
        );

        // A concurrent first call may have won; keep whichever landed first.
        Ok(self.model.get_or_init(|| backend))
    }
}

/// Image classifier running one synchronous prediction per call.
///
/// `predict` is blocking and CPU-bound. Callers that must stay responsive
/// should run it on a worker thread; an `Arc<Classifier<B>>` can be shared
/// freely since the loaded model is read-only.
pub struct Classifier<B: InferenceBackend> {
    model: ModelHandle<B>,
    encoder: TensorEncoder,
    decoder: OutputDecoder,
    input_name: String,
    output_name: String,
}

impl<B: InferenceBackend> Classifier<B> {
    /// Create a classifier around an already loaded backend.
    pub fn new(backend: B) -> Self {
        Self::with_handle(ModelHandle::loaded(backend))
    }

    /// Create a classifier that loads its backend on first use.
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> mpox_inference::Result<B> + Send + Sync + 'static,
    {
        Self::with_handle(ModelHandle::lazy(loader))
    }

    fn with_handle(model: ModelHandle<B>) -> Self {
        let defaults = ModelConfig::default();
        Self {
            model,
            encoder: TensorEncoder::new(),
            decoder: OutputDecoder::default(),
            input_name: defaults.input_name,
            output_name: defaults.output_name,
        }
    }

    /// Apply preprocessing, schema and output settings.
    pub fn with_config(mut self, config: &MpoxConfig) -> Self {
        self.encoder = TensorEncoder::from_config(&config.preprocessing);
        self.decoder = OutputDecoder::from_config(&config.output);
        self.input_name = config.model.input_name.clone();
        self.output_name = config.model.output_name.clone();
        self
    }

    pub fn with_encoder(mut self, encoder: TensorEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_decoder(mut self, decoder: OutputDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Name of the model input the tensor is bound to.
    pub fn with_input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = name.into();
        self
    }

    /// Name of the model output that carries the prediction.
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn encoder(&self) -> &TensorEncoder {
        &self.encoder
    }

    pub fn model(&self) -> &ModelHandle<B> {
        &self.model
    }

    /// Classify one bitmap.
    pub fn predict(&self, bitmap: &Bitmap<'_>) -> Result<Prediction, PredictionError> {
        let start = Instant::now();

        let backend = self.model.get().map_err(PredictionError::ModelLoadFailed)?;

        let tensor = self.encoder.encode(bitmap)?;

        if !backend.input_names().iter().any(|n| *n == self.input_name) {
            return Err(PredictionError::InferenceFailed(InferenceError::InvalidInput(
                format!(
                    "model has no input '{}' (inputs: {:?})",
                    self.input_name,
                    backend.input_names()
                ),
            )));
        }

        let input = InputTensor::from_array(tensor.into_dyn());
        let outputs = backend
            .run(&[(self.input_name.as_str(), input)])
            .map_err(PredictionError::InferenceFailed)?;

        let output = outputs
            .into_iter()
            .find(|(name, _)| *name == self.output_name)
            .map(|(_, tensor)| tensor)
            .ok_or_else(|| {
                PredictionError::InferenceFailed(InferenceError::OutputExtraction(format!(
                    "model produced no output '{}'",
                    self.output_name
                )))
            })?;

        let value = self
            .decoder
            .decode(&output)
            .map_err(PredictionError::InferenceFailed)?;

        let prediction = Prediction {
            output: self.output_name.clone(),
            value,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Prediction complete: {} in {}ms",
            prediction.value, prediction.elapsed_ms
        );

        Ok(prediction)
    }

    /// Classify an image decoded by the `image` crate.
    pub fn predict_image(&self, image: &DynamicImage) -> Result<Prediction, PredictionError> {
        let rgba = image.to_rgba8();
        self.predict(&Bitmap::from_rgba_image(&rgba))
    }
}

#[cfg(feature = "native")]
impl Classifier<crate::OrtBackend> {
    /// Classifier for the configured model file, loaded on first prediction.
    pub fn from_config(config: &MpoxConfig) -> Self {
        let path = config.model.model_path.clone();
        let threads = config.model.num_threads;
        Self::lazy(move || crate::OrtBackend::from_file_with_threads(&path, threads))
            .with_config(config)
    }

    /// Load a model file eagerly.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, PredictionError> {
        let backend =
            crate::OrtBackend::from_file(path).map_err(PredictionError::ModelLoadFailed)?;
        Ok(Self::new(backend))
    }

    /// Load a model from memory eagerly.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PredictionError> {
        let backend =
            crate::OrtBackend::from_bytes(bytes).map_err(PredictionError::ModelLoadFailed)?;
        Ok(Self::new(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bitmap::PixelLayout;
    use mpox_inference::OutputTensor;
    use ndarray::{ArrayD, IxDyn};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Backend returning fixed scores and counting calls.
    struct FixedScores {
        scores: Vec<f32>,
        runs: Arc<AtomicUsize>,
        inputs: Vec<String>,
        outputs: Vec<String>,
    }

    impl FixedScores {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                runs: Arc::new(AtomicUsize::new(0)),
                inputs: vec!["input_1".to_string()],
                outputs: vec!["Identity".to_string()],
            }
        }
    }

    impl InferenceBackend for FixedScores {
        fn run(
            &self,
            inputs: &[(&str, InputTensor)],
        ) -> mpox_inference::Result<Vec<(String, OutputTensor)>> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            assert_eq!(inputs[0].1.shape(), &[1, 300, 300, 3]);
            let len = self.scores.len();
            let arr = ArrayD::from_shape_vec(IxDyn(&[1, len]), self.scores.clone()).unwrap();
            Ok(vec![(self.outputs[0].clone(), OutputTensor::Float32(arr))])
        }

        fn input_names(&self) -> &[String] {
            &self.inputs
        }

        fn output_names(&self) -> &[String] {
            &self.outputs
        }
    }

    fn grey(width: u32, height: u32) -> Vec<u8> {
        [128u8, 128, 128, 255].repeat((width * height) as usize)
    }

    #[test]
    fn test_predict_raw_scores() {
        let classifier = Classifier::new(FixedScores::new(vec![0.25, 0.75]));
        let data = grey(64, 48);
        let bitmap = Bitmap::packed(64, 48, PixelLayout::Bgra, &data);

        let prediction = classifier.predict(&bitmap).unwrap();
        assert_eq!(prediction.output, "Identity");
        assert_eq!(prediction.to_string(), "Prediction: [0.2500, 0.7500]");
    }

    #[test]
    fn test_preprocessing_failure_skips_model() {
        let backend = FixedScores::new(vec![1.0]);
        let runs = backend.runs.clone();
        let classifier = Classifier::new(backend);

        let err = classifier
            .predict(&Bitmap::unavailable(10, 10, PixelLayout::Bgra))
            .unwrap_err();

        assert!(matches!(err, PredictionError::PreprocessingFailed(_)));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_model_load_failure() {
        let classifier: Classifier<FixedScores> =
            Classifier::lazy(|| Err(InferenceError::ModelLoad("missing file".to_string())));

        // Even a degenerate bitmap reports the load failure first.
        let err = classifier
            .predict(&Bitmap::packed(0, 0, PixelLayout::Bgra, &[]))
            .unwrap_err();

        assert!(matches!(err, PredictionError::ModelLoadFailed(_)));
        assert!(!classifier.model().is_loaded());
    }

    #[test]
    fn test_lazy_model_loaded_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let classifier = Classifier::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(FixedScores::new(vec![0.9]))
        });
        let data = grey(8, 8);
        let bitmap = Bitmap::packed(8, 8, PixelLayout::Rgba, &data);

        classifier.predict(&bitmap).unwrap();
        classifier.predict(&bitmap).unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(classifier.model().is_loaded());
    }

    #[test]
    fn test_unknown_input_name() {
        let backend = FixedScores::new(vec![0.5]);
        let runs = backend.runs.clone();
        let classifier = Classifier::new(backend).with_input_name("image");
        let data = grey(4, 4);

        let err = classifier
            .predict(&Bitmap::packed(4, 4, PixelLayout::Bgra, &data))
            .unwrap_err();

        assert!(matches!(
            err,
            PredictionError::InferenceFailed(InferenceError::InvalidInput(_))
        ));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_output() {
        let classifier = Classifier::new(FixedScores::new(vec![0.5])).with_output_name("probs");
        let data = grey(4, 4);

        let err = classifier
            .predict(&Bitmap::packed(4, 4, PixelLayout::Bgra, &data))
            .unwrap_err();

        assert!(matches!(
            err,
            PredictionError::InferenceFailed(InferenceError::OutputExtraction(_))
        ));
    }

    #[test]
    fn test_labels_from_config() {
        let mut config = MpoxConfig::default();
        config.output.labels = vec!["Other".to_string(), "Monkeypox".to_string()];
        let classifier = Classifier::new(FixedScores::new(vec![0.8])).with_config(&config);
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(20, 30));

        let prediction = classifier.predict_image(&image).unwrap();
        assert_eq!(prediction.to_string(), "Prediction: Monkeypox");
    }

    #[test]
    fn test_shared_across_threads() {
        let classifier = Arc::new(Classifier::new(FixedScores::new(vec![0.1, 0.9])));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let classifier = Arc::clone(&classifier);
                std::thread::spawn(move || {
                    let data = grey(16, 16);
                    let bitmap = Bitmap::packed(16, 16, PixelLayout::Bgra, &data);
                    classifier.predict(&bitmap).map(|p| p.to_string())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), "Prediction: [0.1000, 0.9000]");
        }
    }
}
