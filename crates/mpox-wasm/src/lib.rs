//! WASM bindings for on-device mpox photo classification.
//!
//! The model runs in the page through tract; no image ever leaves the
//! browser.

use wasm_bindgen::prelude::*;
use web_sys::ImageData;

use mpox_core::{describe, Bitmap, Classifier, MpoxConfig, PixelLayout, TensorEncoder, TractBackend};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn parse_config(config_json: Option<String>) -> Result<MpoxConfig, JsValue> {
    match config_json {
        Some(json) => serde_json::from_str(&json).map_err(|e| JsValue::from_str(&e.to_string())),
        None => Ok(MpoxConfig::default()),
    }
}

/// Encode RGBA canvas pixels into the flat `[1, H, W, 3]` model input.
#[wasm_bindgen]
pub fn encode_rgba(rgba: &[u8], width: u32, height: u32) -> Result<Vec<f32>, JsValue> {
    let bitmap = Bitmap::packed(width, height, PixelLayout::Rgba, rgba);
    TensorEncoder::new()
        .encode(&bitmap)
        .map(|tensor| tensor.iter().copied().collect())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Classifier class for browser use.
#[wasm_bindgen]
pub struct MpoxClassifier {
    inner: Classifier<TractBackend>,
}

#[wasm_bindgen]
impl MpoxClassifier {
    /// Load a model from its ONNX bytes, optionally with a JSON config.
    #[wasm_bindgen(constructor)]
    pub fn new(model: &[u8], config_json: Option<String>) -> Result<MpoxClassifier, JsValue> {
        let config = parse_config(config_json)?;
        let shape = TensorEncoder::from_config(&config.preprocessing).input_shape();

        let backend = TractBackend::from_bytes_with_shape(model, &shape)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(Self {
            inner: Classifier::new(backend).with_config(&config),
        })
    }

    /// Classify a canvas `ImageData`; returns the text to display.
    #[wasm_bindgen]
    pub fn predict(&self, image: &ImageData) -> String {
        let data = image.data();
        self.predict_rgba(&data, image.width(), image.height())
    }

    /// Classify raw RGBA pixels; returns the text to display.
    #[wasm_bindgen(js_name = predictRgba)]
    pub fn predict_rgba(&self, rgba: &[u8], width: u32, height: u32) -> String {
        let bitmap = Bitmap::packed(width, height, PixelLayout::Rgba, rgba);
        describe(&self.inner.predict(&bitmap))
    }

    /// Classify raw RGBA pixels and return the full prediction object.
    #[wasm_bindgen(js_name = predictDetailed)]
    pub fn predict_detailed(&self, rgba: &[u8], width: u32, height: u32) -> Result<JsValue, JsValue> {
        let bitmap = Bitmap::packed(width, height, PixelLayout::Rgba, rgba);
        let prediction = self
            .inner
            .predict(&bitmap)
            .map_err(|e| JsValue::from_str(&e.user_message()))?;

        serde_wasm_bindgen::to_value(&prediction).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
