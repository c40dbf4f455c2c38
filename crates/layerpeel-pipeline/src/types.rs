//! Shared types for the layerpeel raster pipeline.

use serde::{Deserialize, Serialize};

use crate::detect::DetectionStrategy;
use crate::resample::ResampleFilter;

/// Re-export `GrayImage` so downstream crates can reference mask rasters
/// without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference image states
/// and sprites without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an RGBA image.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A per-pixel selector over an image.
///
/// Backed by a [`GrayImage`] whose pixels are always exactly `0` (unset)
/// or [`BinaryMask::SET`] (set), so the mask can be handed straight to
/// `imageproc` morphology and labelling routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Raster value of a set pixel.
    pub const SET: u8 = 255;

    /// Create an empty (all unset) mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    /// Create a mask by evaluating `f` at every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| {
            image::Luma([if f(x, y) { Self::SET } else { 0 }])
        }))
    }

    /// Wrap a grayscale raster, treating every non-zero pixel as set.
    #[must_use]
    pub fn from_gray(gray: &GrayImage) -> Self {
        Self::from_fn(gray.width(), gray.height(), |x, y| {
            gray.get_pixel(x, y).0[0] != 0
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Mask dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Whether the pixel at `(x, y)` is set.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] != 0
    }

    /// Set or clear the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.0
            .put_pixel(x, y, image::Luma([if value { Self::SET } else { 0 }]));
    }

    /// Number of set pixels.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.0.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
    }

    /// Returns `true` if no pixel is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.pixels().all(|p| p.0[0] == 0)
    }

    /// Borrow the underlying 0/255 raster.
    #[must_use]
    pub const fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    /// Consume the mask and return the underlying 0/255 raster.
    #[must_use]
    pub fn into_gray(self) -> GrayImage {
        self.0
    }
}

/// A positioned RGBA buffer cut out of a larger canvas.
///
/// `x` and `y` are offsets into the canvas the sprite was cut from; the
/// width and height are those of `pixels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    /// Horizontal offset of the left edge in canvas pixels.
    pub x: u32,
    /// Vertical offset of the top edge in canvas pixels.
    pub y: u32,
    /// Cropped pixels, transparency preserved.
    pub pixels: RgbaImage,
}

impl Sprite {
    /// A sprite covering an entire canvas at the origin.
    ///
    /// Used for the terminal full-canvas extraction, where the last
    /// surviving layer is everything left in the image.
    #[must_use]
    pub const fn full_canvas(image: RgbaImage) -> Self {
        Self {
            x: 0,
            y: 0,
            pixels: image,
        }
    }

    /// Sprite width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Sprite height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Returns `true` if the sprite has no visible pixel (zero area or
    /// every alpha is zero).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p.0[3] == 0)
    }
}

/// Configuration for [`extract`](crate::extract::extract).
///
/// One strategy is chosen per deployment; the cleaning parameters travel
/// with the strategy because the two detectors produce very different
/// noise profiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// How changed pixels are detected.
    pub strategy: DetectionStrategy,

    /// Filter used when the compared image must be resized to match the
    /// source image.
    pub resample: ResampleFilter,
}

impl DiffConfig {
    /// Default resampling filter for dimension normalization.
    pub const DEFAULT_RESAMPLE: ResampleFilter = ResampleFilter::Lanczos3;

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// out-of-range parameter.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.strategy.validate()
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            strategy: DetectionStrategy::default(),
            resample: Self::DEFAULT_RESAMPLE,
        }
    }
}

/// Errors that can occur in the raster pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A stage received a zero-sized buffer.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage {
        /// Width of the offending buffer.
        width: u32,
        /// Height of the offending buffer.
        height: u32,
    },

    /// Two buffers that must be compared pixel-for-pixel differ in size.
    #[error(
        "dimension mismatch: expected {}x{}, got {}x{}",
        .expected.width,
        .expected.height,
        .actual.width,
        .actual.height
    )]
    DimensionMismatch {
        /// Dimensions of the reference buffer.
        expected: Dimensions,
        /// Dimensions of the offending buffer.
        actual: Dimensions,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_of_image() {
        let img = RgbaImage::new(7, 3);
        assert_eq!(
            Dimensions::of(&img),
            Dimensions {
                width: 7,
                height: 3
            }
        );
        assert_eq!(Dimensions::of(&img).pixel_count(), 21);
    }

    #[test]
    fn zero_axis_dimensions_are_empty() {
        assert!(
            Dimensions {
                width: 0,
                height: 5
            }
            .is_empty()
        );
        assert!(
            !Dimensions {
                width: 1,
                height: 1
            }
            .is_empty()
        );
    }

    #[test]
    fn mask_from_fn_uses_zero_and_set() {
        let mask = BinaryMask::from_fn(4, 4, |x, _| x < 2);
        assert!(
            mask.as_gray()
                .pixels()
                .all(|p| p.0[0] == 0 || p.0[0] == BinaryMask::SET)
        );
        assert_eq!(mask.count(), 8);
        assert!(mask.get(1, 3));
        assert!(!mask.get(2, 0));
    }

    #[test]
    fn mask_from_gray_normalizes_nonzero() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(0, 0, image::Luma([1]));
        gray.put_pixel(2, 0, image::Luma([200]));
        let mask = BinaryMask::from_gray(&gray);
        assert_eq!(mask.as_gray().get_pixel(0, 0).0[0], BinaryMask::SET);
        assert_eq!(mask.as_gray().get_pixel(1, 0).0[0], 0);
        assert_eq!(mask.as_gray().get_pixel(2, 0).0[0], BinaryMask::SET);
    }

    #[test]
    fn mask_set_and_clear() {
        let mut mask = BinaryMask::new(2, 2);
        assert!(mask.is_empty());
        mask.set(1, 1, true);
        assert!(!mask.is_empty());
        assert_eq!(mask.count(), 1);
        mask.set(1, 1, false);
        assert!(mask.is_empty());
    }

    #[test]
    fn full_canvas_sprite_is_at_origin() {
        let sprite = Sprite::full_canvas(RgbaImage::new(40, 30));
        assert_eq!((sprite.x, sprite.y), (0, 0));
        assert_eq!((sprite.width(), sprite.height()), (40, 30));
    }

    #[test]
    fn transparent_sprite_is_blank() {
        let sprite = Sprite::full_canvas(RgbaImage::new(4, 4));
        assert!(sprite.is_blank());

        let mut pixels = RgbaImage::new(4, 4);
        pixels.put_pixel(2, 2, image::Rgba([0, 0, 0, 1]));
        assert!(!Sprite::full_canvas(pixels).is_blank());
    }

    #[test]
    fn error_empty_image_display() {
        let err = PipelineError::EmptyImage {
            width: 0,
            height: 12,
        };
        assert_eq!(err.to_string(), "image has no pixels (0x12)");
    }

    #[test]
    fn diff_config_serde_accepts_partial_json() {
        let config: DiffConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DiffConfig::default());
    }
}
