//! Borrowed view of a decoded bitmap.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Every supported pixel format stores four interleaved bytes per pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Byte order of a pixel quartet.
///
/// Camera and photo-library bitmaps usually arrive as BGRA; decoders and
/// browser canvases hand out RGBA.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    #[default]
    Bgra,
    Rgba,
    Argb,
    Abgr,
}

impl PixelLayout {
    /// Byte offsets of red, green and blue inside one pixel.
    pub const fn rgb_offsets(self) -> [usize; 3] {
        match self {
            PixelLayout::Bgra => [2, 1, 0],
            PixelLayout::Rgba => [0, 1, 2],
            PixelLayout::Argb => [1, 2, 3],
            PixelLayout::Abgr => [3, 2, 1],
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PixelLayout::Bgra => "bgra",
            PixelLayout::Rgba => "rgba",
            PixelLayout::Argb => "argb",
            PixelLayout::Abgr => "abgr",
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bgra" => Ok(PixelLayout::Bgra),
            "rgba" => Ok(PixelLayout::Rgba),
            "argb" => Ok(PixelLayout::Argb),
            "abgr" => Ok(PixelLayout::Abgr),
            other => Err(format!(
                "unknown pixel layout '{}' (expected bgra, rgba, argb or abgr)",
                other
            )),
        }
    }
}

/// A decoded image owned by the caller.
///
/// The core only reads through this view and never keeps it past a call.
/// `pixels` is `None` when the backing store could not be mapped.
#[derive(Debug, Clone, Copy)]
pub struct Bitmap<'a> {
    width: u32,
    height: u32,
    bytes_per_row: usize,
    layout: PixelLayout,
    pixels: Option<&'a [u8]>,
}

impl<'a> Bitmap<'a> {
    /// Create a view over a buffer with an explicit row stride.
    pub fn new(
        width: u32,
        height: u32,
        bytes_per_row: usize,
        layout: PixelLayout,
        pixels: &'a [u8],
    ) -> Self {
        Self {
            width,
            height,
            bytes_per_row,
            layout,
            pixels: Some(pixels),
        }
    }

    /// Create a view over tightly packed rows (`width * 4` bytes each).
    ///
    /// A row too wide for `usize` saturates the stride, which no buffer can
    /// cover, so encoding reports the buffer as unavailable.
    pub fn packed(width: u32, height: u32, layout: PixelLayout, pixels: &'a [u8]) -> Self {
        Self::new(width, height, packed_stride(width), layout, pixels)
    }

    /// A bitmap whose pixel data cannot be accessed.
    pub fn unavailable(width: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            width,
            height,
            bytes_per_row: packed_stride(width),
            layout,
            pixels: None,
        }
    }

    /// View an image decoded by the `image` crate.
    pub fn from_rgba_image(image: &'a RgbaImage) -> Self {
        Self::packed(image.width(), image.height(), PixelLayout::Rgba, image.as_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn pixels(&self) -> Option<&'a [u8]> {
        self.pixels
    }

    /// Read the raw quartet at `(x, y)`, if it lies inside the buffer.
    pub fn quartet(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize)
            .checked_mul(self.bytes_per_row)?
            .checked_add((x as usize).checked_mul(BYTES_PER_PIXEL)?)?;
        let bytes = self.pixels?.get(offset..offset.checked_add(BYTES_PER_PIXEL)?)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

fn packed_stride(width: u32) -> usize {
    (width as usize).saturating_mul(BYTES_PER_PIXEL)
}
