//! Image-to-tensor encoding for the classifier.

use image::{imageops, DynamicImage, ImageBuffer, Rgba};
use ndarray::Array4;
use tracing::debug;

use crate::error::PreprocessError;
use crate::models::bitmap::{Bitmap, BYTES_PER_PIXEL};
use crate::models::config::{PreprocessConfig, ResizeFilter};

/// Four raw bytes per pixel, still in the source's byte order.
type QuartetBuffer = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Converts bitmaps into the `[1, H, W, 3]` channel-last RGB tensor the
/// model expects, with every element in `[0.0, 1.0]`.
///
/// Images are stretched to the target size; aspect ratio is not preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorEncoder {
    /// Target width for the model input.
    target_width: u32,
    /// Target height for the model input.
    target_height: u32,
    filter: ResizeFilter,
}

impl TensorEncoder {
    /// Create an encoder for 300x300 bilinear input.
    pub fn new() -> Self {
        Self::from_config(&PreprocessConfig::default())
    }

    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            target_width: config.target_width,
            target_height: config.target_height,
            filter: config.filter,
        }
    }

    /// Set the model input size.
    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    /// Set the resampling filter.
    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Shape of the tensors this encoder produces.
    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.target_height as usize, self.target_width as usize, 3]
    }

    /// Encode a bitmap.
    ///
    /// The input is only read. A fresh tensor is returned on every call and
    /// identical input always yields bit-identical output.
    pub fn encode(&self, bitmap: &Bitmap<'_>) -> Result<Array4<f32>, PreprocessError> {
        let resized = self.resize(bitmap)?;

        let (width, height) = resized.dimensions();
        let view = Bitmap::packed(width, height, bitmap.layout(), resized.as_raw());
        let [r, g, b] = bitmap.layout().rgb_offsets();

        let mut tensor = Array4::<f32>::zeros((1, height as usize, width as usize, 3));

        for row in 0..height {
            for col in 0..width {
                let px = view.quartet(col, row).ok_or_else(|| {
                    PreprocessError::BufferUnavailable(format!(
                        "resized buffer has no pixel at ({}, {})",
                        col, row
                    ))
                })?;
                let (row, col) = (row as usize, col as usize);
                tensor[[0, row, col, 0]] = px[r] as f32 / 255.0;
                tensor[[0, row, col, 1]] = px[g] as f32 / 255.0;
                tensor[[0, row, col, 2]] = px[b] as f32 / 255.0;
            }
        }

        debug!(
            "Encoded {}x{} {} bitmap into {:?}",
            bitmap.width(),
            bitmap.height(),
            bitmap.layout(),
            tensor.shape()
        );

        Ok(tensor)
    }

    /// Encode an image decoded by the `image` crate.
    pub fn encode_image(&self, image: &DynamicImage) -> Result<Array4<f32>, PreprocessError> {
        let rgba = image.to_rgba8();
        self.encode(&Bitmap::from_rgba_image(&rgba))
    }

    /// Pack the source rows and stretch them to the target size.
    fn resize(&self, bitmap: &Bitmap<'_>) -> Result<QuartetBuffer, PreprocessError> {
        let (width, height) = bitmap.dimensions();

        if width == 0 || height == 0 {
            return Err(PreprocessError::ResizeFailed {
                width,
                height,
                reason: "degenerate source dimensions".to_string(),
            });
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(PreprocessError::ResizeFailed {
                width,
                height,
                reason: format!(
                    "degenerate target size {}x{}",
                    self.target_width, self.target_height
                ),
            });
        }

        let pixels = bitmap.pixels().ok_or_else(|| {
            PreprocessError::BufferUnavailable("bitmap has no accessible pixel data".to_string())
        })?;

        let row_len = (width as usize).checked_mul(BYTES_PER_PIXEL).ok_or_else(|| {
            PreprocessError::BufferUnavailable(format!(
                "{}-pixel rows are too wide to address",
                width
            ))
        })?;
        let stride = bitmap.bytes_per_row();
        if stride < row_len {
            return Err(PreprocessError::BufferUnavailable(format!(
                "row stride of {} bytes is shorter than a {}-pixel row",
                stride, width
            )));
        }

        let required = stride
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(row_len))
            .ok_or_else(|| {
                PreprocessError::BufferUnavailable(format!(
                    "{}x{} bitmap is too large to address",
                    width, height
                ))
            })?;
        if pixels.len() < required {
            return Err(PreprocessError::BufferUnavailable(format!(
                "buffer holds {} bytes, {}x{} bitmap needs {}",
                pixels.len(),
                width,
                height,
                required
            )));
        }

        let mut packed = Vec::with_capacity(row_len * height as usize);
        for row in pixels.chunks(stride).take(height as usize) {
            packed.extend_from_slice(&row[..row_len]);
        }

        let source = QuartetBuffer::from_raw(width, height, packed).ok_or_else(|| {
            PreprocessError::BufferUnavailable("packed buffer does not match dimensions".to_string())
        })?;

        if (width, height) == (self.target_width, self.target_height) {
            return Ok(source);
        }

        Ok(imageops::resize(
            &source,
            self.target_width,
            self.target_height,
            self.filter.into(),
        ))
    }
}

impl Default for TensorEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bitmap::PixelLayout;
    use pretty_assertions::assert_eq;

    fn solid(width: u32, height: u32, quartet: [u8; 4]) -> Vec<u8> {
        quartet.repeat((width * height) as usize)
    }

    #[test]
    fn test_output_shape_and_range() {
        let encoder = TensorEncoder::new();
        for (w, h) in [(1, 1), (640, 480), (299, 301), (17, 1000)] {
            let data: Vec<u8> = (0..w * h * 4).map(|i| (i * 31 % 256) as u8).collect();
            let bitmap = Bitmap::packed(w, h, PixelLayout::Bgra, &data);

            let tensor = encoder.encode(&bitmap).unwrap();

            assert_eq!(tensor.shape(), &[1, 300, 300, 3]);
            assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn test_single_pixel_channel_order() {
        let encoder = TensorEncoder::new().with_target_size(1, 1);
        let cases = [
            (PixelLayout::Bgra, [30u8, 20, 10, 255]),
            (PixelLayout::Rgba, [10, 20, 30, 255]),
            (PixelLayout::Argb, [255, 10, 20, 30]),
            (PixelLayout::Abgr, [255, 30, 20, 10]),
        ];

        for (layout, quartet) in cases {
            let bitmap = Bitmap::packed(1, 1, layout, &quartet);
            let tensor = encoder.encode(&bitmap).unwrap();

            assert_eq!(tensor.shape(), &[1, 1, 1, 3]);
            assert_eq!(
                tensor.iter().copied().collect::<Vec<_>>(),
                vec![10.0 / 255.0, 20.0 / 255.0, 30.0 / 255.0],
                "layout {}",
                layout
            );
        }
    }

    #[test]
    fn test_channel_last_layout() {
        // 2x1 BGRA: a red pixel followed by a blue one.
        let data = [0u8, 0, 255, 255, 255, 0, 0, 255];
        let bitmap = Bitmap::packed(2, 1, PixelLayout::Bgra, &data);
        let tensor = TensorEncoder::new()
            .with_target_size(2, 1)
            .encode(&bitmap)
            .unwrap();

        let flat: Vec<f32> = tensor.iter().copied().collect();
        assert_eq!(flat, vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_uniform_image_survives_resize() {
        let data = solid(7, 5, [40, 80, 120, 255]);
        let bitmap = Bitmap::packed(7, 5, PixelLayout::Bgra, &data);
        let tensor = TensorEncoder::new().encode(&bitmap).unwrap();

        assert_eq!(tensor[[0, 0, 0, 0]], 120.0 / 255.0);
        assert_eq!(tensor[[0, 150, 150, 1]], 80.0 / 255.0);
        assert_eq!(tensor[[0, 299, 299, 2]], 40.0 / 255.0);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let data: Vec<u8> = (0..123 * 77 * 4).map(|i| (i * 7 % 251) as u8).collect();
        let bitmap = Bitmap::packed(123, 77, PixelLayout::Rgba, &data);
        let encoder = TensorEncoder::new();

        let first = encoder.encode(&bitmap).unwrap();
        let second = encoder.encode(&bitmap).unwrap();

        let bits = |t: &Array4<f32>| t.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
    }

    #[test]
    fn test_black_image_encodes_to_zeros() {
        let data = solid(300, 300, [0, 0, 0, 255]);
        let bitmap = Bitmap::packed(300, 300, PixelLayout::Bgra, &data);
        let tensor = TensorEncoder::new().encode(&bitmap).unwrap();

        assert_eq!(tensor.len(), 300 * 300 * 3);
        assert!(tensor.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_row_padding_is_ignored() {
        // 1x2 image with 8-byte rows; padding bytes must not leak in.
        let data = [10u8, 20, 30, 255, 99, 99, 99, 99, 40, 50, 60, 255];
        let bitmap = Bitmap::new(1, 2, 8, PixelLayout::Rgba, &data);
        let tensor = TensorEncoder::new()
            .with_target_size(1, 2)
            .encode(&bitmap)
            .unwrap();

        let flat: Vec<f32> = tensor.iter().map(|v| (v * 255.0).round()).collect();
        assert_eq!(flat, vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
    }

    #[test]
    fn test_degenerate_dimensions() {
        let bitmap = Bitmap::packed(0, 10, PixelLayout::Bgra, &[]);
        let err = TensorEncoder::new().encode(&bitmap).unwrap_err();
        assert!(matches!(err, PreprocessError::ResizeFailed { width: 0, height: 10, .. }));
    }

    #[test]
    fn test_missing_buffer() {
        let bitmap = Bitmap::unavailable(10, 10, PixelLayout::Bgra);
        let err = TensorEncoder::new().encode(&bitmap).unwrap_err();
        assert!(matches!(err, PreprocessError::BufferUnavailable(_)));
    }

    #[test]
    fn test_short_buffer() {
        let data = vec![0u8; 10 * 10 * 4 - 1];
        let bitmap = Bitmap::packed(10, 10, PixelLayout::Bgra, &data);
        let err = TensorEncoder::new().encode(&bitmap).unwrap_err();
        assert!(matches!(err, PreprocessError::BufferUnavailable(_)));
    }

    #[test]
    fn test_stride_shorter_than_row() {
        let data = vec![0u8; 64];
        let bitmap = Bitmap::new(4, 4, 8, PixelLayout::Bgra, &data);
        let err = TensorEncoder::new().encode(&bitmap).unwrap_err();
        assert!(matches!(err, PreprocessError::BufferUnavailable(_)));
    }

    #[test]
    fn test_oversized_width_with_empty_buffer() {
        for width in [1u32 << 30, u32::MAX] {
            let bitmap = Bitmap::packed(width, 1, PixelLayout::Rgba, &[]);
            let err = TensorEncoder::new().encode(&bitmap).unwrap_err();
            assert!(
                matches!(err, PreprocessError::BufferUnavailable(_)),
                "width {}: {:?}",
                width,
                err
            );
        }
    }

    #[test]
    fn test_zero_stride_is_rejected() {
        let bitmap = Bitmap::new(1 << 30, 1, 0, PixelLayout::Bgra, &[]);
        let err = TensorEncoder::new().encode(&bitmap).unwrap_err();
        assert!(matches!(err, PreprocessError::BufferUnavailable(_)));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let data: Vec<u8> = (0..50 * 40 * 4).map(|i| (i % 256) as u8).collect();
        let before = data.clone();
        let bitmap = Bitmap::packed(50, 40, PixelLayout::Bgra, &data);
        TensorEncoder::new().encode(&bitmap).unwrap();
        assert_eq!(data, before);
    }

    #[test]
    fn test_encode_dynamic_image() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            32,
            24,
            image::Rgb([255, 0, 51]),
        ));
        let tensor = TensorEncoder::new().encode_image(&image).unwrap();

        assert_eq!(tensor.shape(), &[1, 300, 300, 3]);
        assert_eq!(tensor[[0, 10, 20, 0]], 1.0);
        assert_eq!(tensor[[0, 10, 20, 1]], 0.0);
        assert_eq!(tensor[[0, 10, 20, 2]], 51.0 / 255.0);
    }
}
